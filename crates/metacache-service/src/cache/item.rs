use std::collections::{BTreeSet, HashMap};

use crate::types::RequestId;

use super::slot::{PropertySlot, PropertyState};
use super::{PropertyEntry, PropertyMap};

/// Everything the cache knows about one entity, tracked per property.
///
/// Loads happen outside of the item: [`start_requests`](Self::start_requests) tells the caller
/// which properties need loading, and the caller reports the results back through
/// [`store_properties`](Self::store_properties) with the same [`RequestId`]. Results are applied
/// in request order, not in the order they arrive.
///
/// Cloning an item gives an independent snapshot.
#[derive(Debug, Clone)]
pub struct CacheItem<V> {
    properties: HashMap<String, PropertySlot<V>>,
}

impl<V> Default for CacheItem<V> {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
        }
    }
}

impl<V: Clone> CacheItem<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the given properties as loading under `request_id`.
    ///
    /// Returns the names that actually have to be loaded. Properties which are already loading
    /// or fulfilled are skipped.
    pub fn start_requests<I>(&mut self, request_id: RequestId, names: I) -> BTreeSet<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut loading = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            let slot = self.slot_mut(name);
            if slot.state != PropertyState::Invalidated {
                continue;
            }
            debug_assert!(
                request_id > slot.request_id,
                "request {request_id} started after invalidation {}",
                slot.request_id
            );
            slot.state = PropertyState::Loading;
            slot.request_id = request_id;
            loading.insert(name.to_owned());
        }
        loading
    }

    /// Stores the results of request `request_id`.
    ///
    /// Entries for properties that a newer request has touched in the meantime are dropped.
    /// Returns `true` if at least one property was updated.
    pub fn store_properties<I, S>(&mut self, request_id: RequestId, values: I) -> bool
    where
        I: IntoIterator<Item = (S, PropertyEntry<V>)>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for (name, entry) in values {
            let slot = self.slot_mut(name.as_ref());
            if slot.request_id > request_id {
                continue;
            }
            slot.value = Some(entry);
            slot.request_id = request_id;
            slot.state = PropertyState::Fulfilled;
            changed = true;
        }
        changed
    }

    /// Returns the properties started by `request_id` that are still loading to the invalidated
    /// state, so that the next request loads them again.
    ///
    /// Used when the results of a request will never arrive. Properties a newer request has taken
    /// over or that were stored already are left alone.
    pub fn cancel_requests<I>(&mut self, request_id: RequestId, names: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for name in names {
            if let Some(slot) = self.properties.get_mut(name.as_ref()) {
                if slot.request_id == request_id && slot.state == PropertyState::Loading {
                    slot.state = PropertyState::Invalidated;
                }
            }
        }
    }

    /// Whether a result of `request_id` for `name` would be stored.
    pub(crate) fn accepts(&self, request_id: RequestId, name: &str) -> bool {
        self.properties
            .get(name)
            .is_none_or(|slot| slot.request_id <= request_id)
    }

    /// Marks every known property as invalidated.
    ///
    /// `request_id` must be newer than every request that touched this item. Loads still in
    /// flight will have their results dropped.
    pub fn invalidate(&mut self, request_id: RequestId) {
        for slot in self.properties.values_mut() {
            debug_assert!(
                request_id > slot.request_id,
                "invalidation {request_id} is not newer than request {}",
                slot.request_id
            );
            slot.request_id = request_id;
            slot.state = PropertyState::Invalidated;
        }
    }

    /// Returns the cached entries for `names`, whether they are fresh or not.
    ///
    /// Properties that never received a value are absent from the result. Stored errors are
    /// returned as they are.
    pub fn get<I>(&mut self, names: I) -> PropertyMap<V>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut result = PropertyMap::new();
        for name in names {
            let name = name.as_ref();
            if let Some(value) = &self.slot_mut(name).value {
                result.insert(name.to_owned(), value.clone());
            }
        }
        result
    }

    /// Whether all of `names` are cached and fulfilled.
    pub fn has_fresh_cache<I>(&self, names: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        names.into_iter().all(|name| {
            self.properties
                .get(name.as_ref())
                .is_some_and(|slot| slot.state == PropertyState::Fulfilled)
        })
    }

    /// The current state of one property, if it is known at all.
    pub fn state(&self, name: &str) -> Option<PropertyState> {
        self.properties.get(name).map(|slot| slot.state)
    }

    /// The number of known properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn slot_mut(&mut self, name: &str) -> &mut PropertySlot<V> {
        self.properties.entry(name.to_owned()).or_default()
    }
}
