//! # Staleness-aware property cache
//!
//! Metadata of an entity (a file, say) is made up of independent properties like its size or
//! modification time. Each of them is loaded asynchronously, and each can go stale on its own.
//! This module tracks every property of every entity through a small state machine:
//!
//! ```text
//! Invalidated --start_requests--> Loading --store_properties--> Fulfilled
//!      ^                             |                              |
//!      +---------invalidate----------+------------invalidate--------+
//! ```
//!
//! ## Request ids
//!
//! Loads can complete in any order. Every operation is therefore tagged with a
//! [`RequestId`](crate::types::RequestId), and each property remembers the id of the last request
//! that touched it. Results of a request are only applied to properties that no newer request
//! (or invalidation) has touched since. Which result wins is decided by request id, never by
//! arrival time.
//!
//! Invalidating an item stamps all its properties with the invalidation's id. This forces the
//! next request to reload them, and drops the results of loads which were still in flight.
//!
//! ## [`PropertyEntry`] / [`PropertyError`]
//!
//! Stored entries are a [`Result`] around a [`PropertyError`]. A property that failed to load is
//! cached just like a successful one, and reading it returns the error.
//!
//! ## Reading
//!
//! [`CacheItem::get`] returns whatever is cached, fresh or not. Callers that need fresh data check
//! [`CacheItem::has_fresh_cache`] first. Cloning an item (or taking a
//! [`MetadataCacheSet::snapshot`]) gives an independent copy that later writes do not affect.

mod error;
mod item;
mod set;
mod slot;

pub use error::*;
pub use item::*;
pub use set::*;
pub use slot::PropertyState;
