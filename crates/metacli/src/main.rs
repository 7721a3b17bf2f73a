//! Sums up the sizes of files and directory trees through the metadata cache.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use metacache_service::aggregate::{Aggregator, Totals};
use metacache_service::fs::{FsEntry, FsMetadataProvider};
use metacache_service::model::MetadataModel;
use metacache_service::types::TicketCounter;
use metacache_service::{logging, metrics};

use settings::Settings;

mod output;
mod settings;

/// The outcome of one run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub paths: Vec<PathBuf>,
    pub property: String,
    #[serde(flatten)]
    pub totals: Totals,
    /// The number of batches the aggregation went through.
    pub batches: usize,
    /// `false` if the aggregation was interrupted.
    pub complete: bool,
    pub cached_entities: usize,
}

fn main() {
    match execute() {
        Ok(()) => std::process::exit(0),
        Err(error) => {
            logging::ensure_log_error(&error);
            std::process::exit(1);
        }
    }
}

fn execute() -> Result<()> {
    let settings = Settings::get()?;
    let config = &settings.config;

    // SAFETY: The runtime has not been started yet, so this is still single-threaded.
    unsafe { logging::init_logging(config) };
    if let Some(ref statsd) = config.metrics.statsd {
        metrics::configure_statsd(
            &config.metrics.prefix,
            statsd.as_str(),
            config.metrics.custom_tags.clone(),
        )?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;
    let report = runtime.block_on(aggregate(&settings))?;

    output::print(&report, settings.output_format)
}

async fn aggregate(settings: &Settings) -> Result<Report> {
    let config = &settings.config;

    let mut roots = Vec::with_capacity(settings.paths.len());
    for path in &settings.paths {
        let root = FsEntry::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        roots.push(root);
    }

    let model = Arc::new(MetadataModel::new(FsMetadataProvider, &config.model));
    let aggregator = Aggregator::new(model.clone(), &config.aggregation);

    let tickets = Arc::new(TicketCounter::new());
    let ticket = tickets.next();

    // Ctrl-C supersedes the running aggregation, which then stops after its current batch.
    let interrupt = tokio::spawn({
        let tickets = tickets.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, finishing the current batch");
                tickets.next();
            }
        }
    });

    let mut batches = 0;
    let totals = aggregator
        .run(ticket, roots, |ticket, totals| {
            batches += 1;
            tracing::debug!(%ticket, count = totals.count, size = totals.size, "batch done");
            tickets.is_current(ticket)
        })
        .await;
    interrupt.abort();

    let complete = tickets.is_current(ticket);
    if !complete {
        tracing::warn!(%ticket, "aggregation was interrupted, totals are partial");
    }

    Ok(Report {
        paths: settings.paths.clone(),
        property: config.aggregation.property.clone(),
        totals,
        batches,
        complete,
        cached_entities: model.cached_entities(),
    })
}
