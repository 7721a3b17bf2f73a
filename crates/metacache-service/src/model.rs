use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture};
use tokio::sync::broadcast;

use crate::cache::{LoadRequest, MetadataCacheSet, PropertyError, PropertyMap, UpdateEvent};
use crate::config::ModelConfig;
use crate::provider::{Entity, MetadataProvider};
use crate::types::RequestId;

type Key<P> = <<P as MetadataProvider>::Entity as Entity>::Key;

/// The cache set together with the id of the last request applied to it.
///
/// Ids are only issued while the lock is held, so the cache sees them in increasing order.
struct ModelCache<K, V> {
    set: MetadataCacheSet<K, V>,
    last_request_id: RequestId,
}

impl<K: std::fmt::Debug, V> std::fmt::Debug for ModelCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("set", &self.set)
            .field("last_request_id", &self.last_request_id)
            .finish()
    }
}

impl<K, V> ModelCache<K, V> {
    fn next_request_id(&mut self) -> RequestId {
        self.last_request_id = self.last_request_id.next();
        self.last_request_id
    }
}

/// Cancels the started requests of a [`MetadataModel::get`] that did not get to store its results,
/// for example because its future was dropped.
struct PendingLoads<'a, K: Eq + Hash + Clone, V: Clone> {
    cache: &'a Mutex<ModelCache<K, V>>,
    request_id: RequestId,
    requests: &'a [LoadRequest<K>],
    done: bool,
}

impl<K: Eq + Hash + Clone, V: Clone> Drop for PendingLoads<'_, K, V> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        tracing::debug!(request_id = %self.request_id, "request abandoned, cancelling its loads");
        metric!(counter("metadata.requests.cancelled") += 1);
        // a poisoned lock means we are unwinding already
        if let Ok(mut cache) = self.cache.lock() {
            cache.set.cancel_requests(self.request_id, self.requests);
        }
    }
}

/// Loads metadata through a [`MetadataCacheSet`].
///
/// Every [`get`](Self::get) is a new request: properties which are neither fresh nor already
/// being loaded are fetched from the provider and stored under that request's id.
pub struct MetadataModel<P: MetadataProvider> {
    provider: P,
    cache: Mutex<ModelCache<Key<P>, P::Value>>,
    load_timeout: Duration,
}

impl<P: MetadataProvider> std::fmt::Debug for MetadataModel<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataModel")
            .field("cache", &self.cache)
            .field("load_timeout", &self.load_timeout)
            .finish()
    }
}

impl<P: MetadataProvider> MetadataModel<P> {
    pub fn new(provider: P, config: &ModelConfig) -> Self {
        Self {
            provider,
            cache: Mutex::new(ModelCache {
                set: MetadataCacheSet::new(),
                last_request_id: RequestId::ZERO,
            }),
            load_timeout: config.load_timeout,
        }
    }

    fn cache(&self) -> MutexGuard<'_, ModelCache<Key<P>, P::Value>> {
        self.cache.lock().unwrap()
    }

    /// Returns the `names` properties of `entities`, loading whatever is stale.
    ///
    /// The result has one map per entity, in order. Properties another request is still loading
    /// are returned as currently cached, which may be stale or missing.
    ///
    /// If the returned future is dropped before it completes, the properties it started loading
    /// are invalidated again, so a later request picks them up.
    #[tracing::instrument(skip_all, fields(entities = entities.len()))]
    pub async fn get(&self, entities: &[P::Entity], names: &[&str]) -> Vec<PropertyMap<P::Value>> {
        let keys: Vec<_> = entities.iter().map(Entity::key).collect();

        let (request_id, requests) = {
            let mut cache = self.cache();
            let request_id = cache.next_request_id();
            let requests = cache.set.start_requests(request_id, &keys, names);
            (request_id, requests)
        };
        metric!(counter("metadata.requests") += 1);

        if !requests.is_empty() {
            metric!(counter("metadata.loads") += requests.len() as i64);
            let mut pending = PendingLoads {
                cache: &self.cache,
                request_id,
                requests: &requests,
                done: false,
            };
            let by_key: HashMap<_, _> = keys.iter().zip(entities).collect();

            let loads = requests.iter().filter_map(|request| {
                let entity = by_key.get(&request.key)?;
                Some(async move {
                    let values = self.load_properties(entity, &request.names).await;
                    (request.key.clone(), values)
                })
            });
            let results = future::join_all(loads).await;

            let changed = self.cache().set.store_properties(request_id, results);
            pending.done = true;
            if !changed {
                tracing::debug!(%request_id, "all loaded properties were superseded");
                metric!(counter("metadata.store.superseded") += 1);
            }
        }

        self.cache().set.get(&keys, names)
    }

    async fn load_properties(
        &self,
        entity: &P::Entity,
        names: &BTreeSet<String>,
    ) -> PropertyMap<P::Value> {
        let start = Instant::now();
        let future = tokio::time::timeout(self.load_timeout, self.provider.load(entity, names));
        let result = match future.await {
            Ok(result) => result,
            Err(_) => Err(PropertyError::Timeout(self.load_timeout)),
        };
        metric!(timer("metadata.load.duration") = start.elapsed());

        match result {
            Ok(mut values) => {
                values.retain(|name, _| names.contains(name));
                for name in names {
                    // a property the provider did not report would otherwise stay loading forever
                    values
                        .entry(name.clone())
                        .or_insert_with(|| Err(PropertyError::Unsupported(name.clone())));
                }
                values
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    entity = ?entity.key(),
                    "failed to load metadata"
                );
                names
                    .iter()
                    .map(|name| (name.clone(), Err(err.clone())))
                    .collect()
            }
        }
    }

    /// Returns the cached `names` properties of `entities` without loading anything.
    pub fn get_cache(&self, entities: &[P::Entity], names: &[&str]) -> Vec<PropertyMap<P::Value>> {
        let keys: Vec<_> = entities.iter().map(Entity::key).collect();
        self.cache().set.get(&keys, names)
    }

    /// Whether `names` are fresh for all of `entities`.
    pub fn has_fresh_cache(&self, entities: &[P::Entity], names: &[&str]) -> bool {
        let keys: Vec<_> = entities.iter().map(Entity::key).collect();
        self.cache().set.has_fresh_cache(&keys, names)
    }

    /// Invalidates everything cached about `entities`, for example because they changed on disk.
    pub fn notify_entries_changed(&self, entities: &[P::Entity]) {
        let keys: Vec<_> = entities.iter().map(Entity::key).collect();
        let mut cache = self.cache();
        let request_id = cache.next_request_id();
        cache.set.invalidate(request_id, &keys);
    }

    /// Evicts `entities` from the cache.
    pub fn clear(&self, entities: &[P::Entity]) {
        let keys: Vec<_> = entities.iter().map(Entity::key).collect();
        self.cache().set.clear(&keys);
    }

    /// Evicts everything from the cache.
    pub fn clear_all(&self) {
        self.cache().set.clear_all();
    }

    /// The number of entities in the cache.
    pub fn cached_entities(&self) -> usize {
        self.cache().set.len()
    }

    /// Subscribes to cache updates.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent<Key<P>>> {
        self.cache().set.subscribe()
    }
}

impl<P: MetadataProvider> MetadataProvider for MetadataModel<P> {
    type Entity = P::Entity;
    type Value = P::Value;

    fn load<'a>(
        &'a self,
        entity: &'a Self::Entity,
        names: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<PropertyMap<Self::Value>, PropertyError>> {
        Box::pin(async move {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut values = self.get(std::slice::from_ref(entity), &names).await;
            Ok(values.pop().unwrap_or_default())
        })
    }
}
