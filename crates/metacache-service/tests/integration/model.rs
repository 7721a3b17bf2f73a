use metacache_service::cache::PropertyError;
use metacache_service::config::Config;
use metacache_service::fs::{FsValue, IS_DIRECTORY, SIZE};

use crate::{open_all, setup_aggregator};

#[tokio::test]
async fn test_model_over_fs() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(&[("file", 12), ("dir/", 0)]);
    let (model, _) = setup_aggregator(&Config::default());
    let entries = open_all(dir.path(), &["file", "dir"]).await;

    let values = model.get(&entries, &[SIZE, IS_DIRECTORY]).await;
    assert_eq!(values[0][SIZE], Ok(FsValue::Size(12)));
    assert_eq!(values[0][IS_DIRECTORY], Ok(FsValue::IsDirectory(false)));
    assert_eq!(values[1][SIZE], Ok(FsValue::Size(0)));
    assert_eq!(values[1][IS_DIRECTORY], Ok(FsValue::IsDirectory(true)));
    assert!(model.has_fresh_cache(&entries, &[SIZE, IS_DIRECTORY]));
}

#[tokio::test]
async fn test_missing_file_is_cached_as_error() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(&[("file", 12)]);
    let (model, _) = setup_aggregator(&Config::default());
    let entries = open_all(dir.path(), &["file"]).await;
    std::fs::remove_file(dir.path().join("file")).unwrap();

    let values = model.get(&entries, &[SIZE]).await;
    assert_eq!(values[0][SIZE], Err(PropertyError::NotFound));
    assert!(model.has_fresh_cache(&entries, &[SIZE]));

    // the file comes back, the cached error stays until the model is told
    metacache_test::write_file(&dir.path().join("file"), 5);
    assert_eq!(
        model.get(&entries, &[SIZE]).await[0][SIZE],
        Err(PropertyError::NotFound)
    );

    model.notify_entries_changed(&entries);
    assert_eq!(
        model.get(&entries, &[SIZE]).await[0][SIZE],
        Ok(FsValue::Size(5))
    );
}

#[tokio::test]
async fn test_unsupported_property() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(&[("file", 1)]);
    let (model, _) = setup_aggregator(&Config::default());
    let entries = open_all(dir.path(), &["file"]).await;

    let values = model.get(&entries, &["owner"]).await;
    assert_eq!(
        values[0]["owner"],
        Err(PropertyError::Unsupported("owner".into()))
    );
}

#[tokio::test]
async fn test_update_events() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(&[("file", 1)]);
    let (model, _) = setup_aggregator(&Config::default());
    let entries = open_all(dir.path(), &["file"]).await;
    let mut updates = model.subscribe();

    model.get(&entries, &[SIZE]).await;
    let event = updates.try_recv().unwrap();
    assert_eq!(event.keys, vec![dir.path().join("file")]);
    assert!(event.names.contains(SIZE));

    // nothing is loaded for fresh properties, so nothing changes
    model.get(&entries, &[SIZE]).await;
    assert!(updates.try_recv().is_err());

    model.clear_all();
    assert_eq!(model.cached_entities(), 0);
    assert!(!model.has_fresh_cache(&entries, &[SIZE]));
}
