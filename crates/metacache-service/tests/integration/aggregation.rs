use metacache_service::aggregate::{Aggregator, Totals};
use metacache_service::config::Config;
use metacache_service::fs::{FsEntry, FsMetadataProvider};
use metacache_service::types::{Ticket, TicketCounter};

use crate::{open_all, setup_aggregator};

const TREE: &[(&str, u64)] = &[
    ("top.bin", 100),
    ("docs/readme.md", 20),
    ("docs/guide/intro.md", 3),
    ("docs/guide/empty/", 0),
    ("src/main.rs", 7),
];

#[tokio::test]
async fn test_sum_directory_tree() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(TREE);

    let aggregator = Aggregator::new(FsMetadataProvider, &Config::default().aggregation);
    let root = FsEntry::open(dir.path()).await.unwrap();

    let mut batches = 0;
    let totals = aggregator
        .run(Ticket(1), vec![root], |_, _| {
            batches += 1;
            true
        })
        .await;

    assert_eq!(totals, Totals { count: 4, size: 130 });
    // the roots, then one batch per directory
    assert_eq!(batches, 6);
}

#[tokio::test]
async fn test_mixed_roots() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(TREE);

    let aggregator = Aggregator::new(FsMetadataProvider, &Config::default().aggregation);
    let roots = open_all(dir.path(), &["top.bin", "src"]).await;

    let totals = aggregator.run(Ticket(1), roots, |_, _| true).await;
    assert_eq!(totals, Totals { count: 2, size: 107 });
}

#[tokio::test]
async fn test_file_removed_during_aggregation() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(&[("a", 1), ("b", 2), ("c", 3)]);

    let aggregator = Aggregator::new(FsMetadataProvider, &Config::default().aggregation);
    let files = open_all(dir.path(), &["a", "b", "c"]).await;
    std::fs::remove_file(dir.path().join("b")).unwrap();

    let totals = aggregator.run(Ticket(1), files, |_, _| true).await;
    assert_eq!(totals, Totals { count: 2, size: 4 });
}

#[tokio::test]
async fn test_reaggregate_from_cache() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(TREE);
    let (model, aggregator) = setup_aggregator(&Config::default());
    let tickets = TicketCounter::new();
    let root = FsEntry::open(dir.path()).await.unwrap();

    let first = aggregator
        .run(tickets.next(), vec![root.clone()], |ticket, _| {
            tickets.is_current(ticket)
        })
        .await;
    assert_eq!(first, Totals { count: 4, size: 130 });
    let cached = model.cached_entities();
    assert!(cached >= 4);

    // files changed on disk are served from the cache until the model is notified
    metacache_test::write_file(&dir.path().join("top.bin"), 1000);
    let second = aggregator.run(tickets.next(), vec![root.clone()], |_, _| true).await;
    assert_eq!(second, first);
    assert_eq!(model.cached_entities(), cached);

    let changed = open_all(dir.path(), &["top.bin"]).await;
    model.notify_entries_changed(&changed);
    let third = aggregator.run(tickets.next(), vec![root], |_, _| true).await;
    assert_eq!(third, Totals { count: 4, size: 1030 });
}

#[tokio::test]
async fn test_superseded_aggregation() {
    metacache_test::setup();
    let dir = metacache_test::fixture_tree(TREE);
    let (_model, aggregator) = setup_aggregator(&Config::default());
    let tickets = TicketCounter::new();
    let root = FsEntry::open(dir.path()).await.unwrap();

    let ticket = tickets.next();
    let totals = aggregator
        .run(ticket, vec![root], |ticket, totals| {
            if totals.count > 0 {
                // a newer aggregation was started
                tickets.next();
            }
            tickets.is_current(ticket)
        })
        .await;

    assert_eq!(totals, Totals { count: 1, size: 100 });
    assert!(!tickets.is_current(ticket));
}
