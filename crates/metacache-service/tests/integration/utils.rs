use std::path::Path;
use std::sync::Arc;

use metacache_service::aggregate::Aggregator;
use metacache_service::config::Config;
use metacache_service::fs::{FsEntry, FsMetadataProvider};
use metacache_service::model::MetadataModel;

pub type FsModel = MetadataModel<FsMetadataProvider>;

/// Opens the entries at `paths` below `root`.
pub async fn open_all(root: &Path, paths: &[&str]) -> Vec<FsEntry> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        entries.push(FsEntry::open(root.join(path)).await.unwrap());
    }
    entries
}

/// Creates a model over the file system and an aggregator on top of it.
pub fn setup_aggregator(config: &Config) -> (Arc<FsModel>, Aggregator<Arc<FsModel>>) {
    let model = Arc::new(MetadataModel::new(FsMetadataProvider, &config.model));
    let aggregator = Aggregator::new(model.clone(), &config.aggregation);
    (model, aggregator)
}
