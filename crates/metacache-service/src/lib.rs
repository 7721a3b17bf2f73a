//! Staleness-aware metadata caching.
//!
//! The building blocks, bottom up:
//!
//! - [`cache::CacheItem`] tracks every property of one entity as invalidated, loading or
//!   fulfilled, and resolves racing loads by [`RequestId`](types::RequestId).
//! - [`cache::MetadataCacheSet`] holds one item per entity.
//! - [`model::MetadataModel`] issues request ids and drives a
//!   [`MetadataProvider`](provider::MetadataProvider) through the cache.
//! - [`aggregate::Aggregator`] walks a tree of entities and sums up one property.

#[macro_use]
pub mod metrics;

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod fs;
pub mod logging;
pub mod model;
pub mod provider;
pub mod types;

#[cfg(any(feature = "test", test))]
#[allow(unused)]
pub mod test;
