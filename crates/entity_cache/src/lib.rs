//! Entity cache crate.
//!
//! Holds fetched entity lists for the session and hands them to consumers
//! through typed queries.

pub mod hooks;
pub mod store;

pub use hooks::{EntityHooks, EntityQuery, QueryState};
pub use store::{CacheEntry, CachedRecord, EntityCache};
