//! In-memory entities and providers for tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use crate::cache::{PropertyError, PropertyMap};
use crate::provider::{Entity, MetadataProvider};

/// A file or directory that only exists in memory.
#[derive(Clone, Debug)]
pub struct FakeEntity {
    pub path: String,
    pub size: u64,
    children: Option<Arc<Vec<FakeEntity>>>,
    broken: bool,
}

impl FakeEntity {
    pub fn file(path: &str, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            children: None,
            broken: false,
        }
    }

    pub fn dir(path: &str, children: Vec<FakeEntity>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            children: Some(Arc::new(children)),
            broken: false,
        }
    }

    /// A directory that fails to be listed.
    pub fn broken_dir(path: &str) -> Self {
        Self {
            broken: true,
            ..Self::dir(path, vec![])
        }
    }
}

impl Entity for FakeEntity {
    type Key = String;

    fn key(&self) -> String {
        self.path.clone()
    }

    fn is_container(&self) -> bool {
        self.children.is_some()
    }

    fn list_children(&self) -> BoxFuture<'_, Result<Vec<Self>, PropertyError>> {
        Box::pin(async move {
            if self.broken {
                return Err(PropertyError::PermissionDenied(self.path.clone()));
            }
            Ok(self
                .children
                .as_deref()
                .cloned()
                .unwrap_or_default())
        })
    }
}

/// Serves the `size` property of [`FakeEntity`]s and counts its loads.
///
/// Other properties are left out of the results.
#[derive(Debug, Default)]
pub struct FakeProvider {
    failing: HashSet<String>,
    sizes: Mutex<HashMap<String, u64>>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every load of the given paths fail.
    pub fn failing(paths: &[&str]) -> Self {
        Self {
            failing: paths.iter().map(|path| path.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Delays every load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Overrides the size reported for `path`.
    pub fn set_size(&self, path: &str, size: u64) {
        self.sizes.lock().unwrap().insert(path.into(), size);
    }

    /// How often [`load`](MetadataProvider::load) was called.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl MetadataProvider for FakeProvider {
    type Entity = FakeEntity;
    type Value = u64;

    fn load<'a>(
        &'a self,
        entity: &'a FakeEntity,
        names: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<PropertyMap<u64>, PropertyError>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&entity.path) {
                return Err(PropertyError::LoadError(format!(
                    "injected failure for {}",
                    entity.path
                )));
            }

            let size = self
                .sizes
                .lock()
                .unwrap()
                .get(&entity.path)
                .copied()
                .unwrap_or(entity.size);
            Ok(names
                .iter()
                .filter(|name| *name == "size")
                .map(|name| (name.clone(), Ok(size)))
                .collect())
        })
    }
}
