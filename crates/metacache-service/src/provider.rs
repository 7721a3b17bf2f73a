//! The seams between the cache and the outside world.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::cache::{PropertyError, PropertyMap};

/// Something metadata can be loaded for, like a file or a directory.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifies the entity in the cache.
    type Key: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;

    /// The cache key of this entity.
    fn key(&self) -> Self::Key;

    /// Whether the entity can have children, like a directory.
    fn is_container(&self) -> bool;

    /// Lists the children of a container.
    ///
    /// Only called when [`is_container`](Self::is_container) returns `true`.
    fn list_children(&self) -> BoxFuture<'_, Result<Vec<Self>, PropertyError>>;
}

/// Performs the actual, usually I/O bound, loading of properties.
pub trait MetadataProvider: Send + Sync {
    type Entity: Entity;
    type Value: Clone + Send + Sync + 'static;

    /// Loads the `names` properties of `entity`.
    ///
    /// A property that fails on its own is returned as an `Err` entry in the map. An `Err` result
    /// means that the whole load failed.
    fn load<'a>(
        &'a self,
        entity: &'a Self::Entity,
        names: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<PropertyMap<Self::Value>, PropertyError>>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    type Entity = P::Entity;
    type Value = P::Value;

    fn load<'a>(
        &'a self,
        entity: &'a Self::Entity,
        names: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<PropertyMap<Self::Value>, PropertyError>> {
        (**self).load(entity, names)
    }
}

/// Property values that can be summed up as a size in bytes.
pub trait ByteSize {
    /// The size in bytes, if this value denotes one.
    fn byte_size(&self) -> Option<u64>;
}

impl ByteSize for u64 {
    fn byte_size(&self) -> Option<u64> {
        Some(*self)
    }
}
