//! In-process caching.
//!
//! Entries live in a [`DashMap`](dashmap::DashMap) with a per-entry TTL and
//! are stored as opaque bytes; typed caches such as [`ProfileCache`] layer
//! key naming and MessagePack encoding on top of the shared [`CacheBackend`].

pub mod backend;
pub mod profile;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
pub use profile::{CacheError, ProfileCache};
