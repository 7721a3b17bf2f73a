use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

use tokio::sync::broadcast;

use crate::types::RequestId;

use super::{CacheItem, PropertyMap};

/// How many [`UpdateEvent`]s a slow subscriber may lag behind before it misses some.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// The properties of one entity that have to be loaded for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest<K> {
    pub key: K,
    pub names: BTreeSet<String>,
}

/// Sent to subscribers whenever stored results changed the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent<K> {
    /// The entities that received new values.
    pub keys: Vec<K>,
    /// The union of all properties that were stored.
    pub names: BTreeSet<String>,
}

/// A [`CacheItem`] per entity, keyed by entity identity.
pub struct MetadataCacheSet<K, V> {
    items: HashMap<K, CacheItem<V>>,
    updates: broadcast::Sender<UpdateEvent<K>>,
}

impl<K: fmt::Debug, V> fmt::Debug for MetadataCacheSet<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCacheSet")
            .field("items", &self.items.len())
            .field("subscribers", &self.updates.receiver_count())
            .finish()
    }
}

impl<K, V> Default for MetadataCacheSet<K, V>
where
    K: Clone,
{
    fn default() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            items: HashMap::new(),
            updates,
        }
    }
}

impl<K, V> MetadataCacheSet<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `request_id` for `names` on every entity in `keys`.
    ///
    /// Returns one [`LoadRequest`] per entity that has properties to load.
    pub fn start_requests<'k, I>(
        &mut self,
        request_id: RequestId,
        keys: I,
        names: &[&str],
    ) -> Vec<LoadRequest<K>>
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        let mut requests = Vec::new();
        for key in keys {
            let item = self.items.entry(key.clone()).or_default();
            let names = item.start_requests(request_id, names);
            if !names.is_empty() {
                requests.push(LoadRequest {
                    key: key.clone(),
                    names,
                });
            }
        }
        requests
    }

    /// Stores the results of `request_id` for several entities.
    ///
    /// Returns `true` if any entity changed, in which case subscribers are notified.
    pub fn store_properties<I>(&mut self, request_id: RequestId, results: I) -> bool
    where
        I: IntoIterator<Item = (K, PropertyMap<V>)>,
    {
        let mut keys = Vec::new();
        let mut names = BTreeSet::new();
        for (key, values) in results {
            let item = self.items.entry(key.clone()).or_default();
            let stored_names: Vec<String> = values
                .keys()
                .filter(|name| item.accepts(request_id, name))
                .cloned()
                .collect();
            if item.store_properties(request_id, values) {
                keys.push(key);
                names.extend(stored_names);
            }
        }

        if keys.is_empty() {
            return false;
        }
        // there may be nobody listening, which is fine
        self.updates.send(UpdateEvent { keys, names }).ok();
        true
    }

    /// Gives up on `requests` started under `request_id`, so their properties are loaded again.
    pub fn cancel_requests(&mut self, request_id: RequestId, requests: &[LoadRequest<K>]) {
        for request in requests {
            if let Some(item) = self.items.get_mut(&request.key) {
                item.cancel_requests(request_id, &request.names);
            }
        }
    }

    /// Invalidates the cached properties of `keys`.
    ///
    /// Entities the cache does not know are ignored.
    pub fn invalidate<'k, I>(&mut self, request_id: RequestId, keys: I)
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        for key in keys {
            if let Some(item) = self.items.get_mut(key) {
                item.invalidate(request_id);
            }
        }
    }

    /// Returns the best available entries for `names`, one map per key.
    pub fn get<'k, I>(&mut self, keys: I, names: &[&str]) -> Vec<PropertyMap<V>>
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        keys.into_iter()
            .map(|key| self.items.entry(key.clone()).or_default().get(names))
            .collect()
    }

    /// Whether `names` are fresh for every entity in `keys`.
    pub fn has_fresh_cache<'k, I>(&self, keys: I, names: &[&str]) -> bool
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        keys.into_iter().all(|key| {
            self.items
                .get(key)
                .is_some_and(|item| item.has_fresh_cache(names))
        })
    }

    /// The item for one entity.
    pub fn item(&self, key: &K) -> Option<&CacheItem<V>> {
        self.items.get(key)
    }

    /// Evicts the given entities.
    pub fn clear<'k, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        for key in keys {
            self.items.remove(key);
        }
    }

    /// Evicts every entity.
    pub fn clear_all(&mut self) {
        self.items.clear();
    }

    /// Copies the items of `keys` into a new, independent set.
    pub fn snapshot<'k, I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        let mut snapshot = Self::new();
        for key in keys {
            if let Some(item) = self.items.get(key) {
                snapshot.items.insert(key.clone(), item.clone());
            }
        }
        snapshot
    }

    /// Subscribes to [`UpdateEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent<K>> {
        self.updates.subscribe()
    }

    /// The number of cached entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
