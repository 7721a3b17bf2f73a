//! Helpers for testing the cache against a real file system.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all console output
//!    is captured by the test runner.
//!
//!  - Hold the [`TempDir`] returned by [`tempdir`] or [`fixture_tree`] for the entire test. The
//!    directory is deleted as soon as the handle is dropped.

use std::fs;
use std::path::Path;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;

pub use tempfile::TempDir;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the `metacache_service` crate and
///    mutes all other logs.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("metacache_service=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// Creates a temporary directory.
///
/// The directory is deleted when the [`TempDir`] instance is dropped.
pub fn tempdir() -> TempDir {
    TempDir::new().unwrap()
}

/// Creates a temporary directory tree.
///
/// Every entry is a path relative to the root and the size of the file to create there, filled
/// with zero bytes. Missing parent directories are created along the way. Paths ending in `/`
/// create an empty directory and ignore the size.
///
/// # Panics
///
/// Panics if any of the files or directories cannot be created.
pub fn fixture_tree(entries: &[(&str, u64)]) -> TempDir {
    let dir = tempdir();
    for &(path, size) in entries {
        let full_path = dir.path().join(path);
        if path.ends_with('/') {
            fs::create_dir_all(&full_path).unwrap();
            continue;
        }
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        write_file(&full_path, size);
    }
    dir
}

/// Writes `size` zero bytes to `path`, replacing any existing file.
pub fn write_file(path: &Path, size: u64) {
    let contents = vec![0u8; size as usize];
    fs::write(path, contents)
        .unwrap_or_else(|err| panic!("cannot write '{}': {err}", path.display()));
}
