//! In-memory storage backend for the Cuttlefish server.
//!
//! This crate provides an in-memory implementation of the `UserStore` and
//! `ProfileStore` traits from `cuttlefish-storage`, using papaya lock-free
//! HashMaps for concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use cuttlefish_db_memory::InMemoryStorage;
//! use cuttlefish_storage::{User, UserStore};
//!
//! let storage = InMemoryStorage::new();
//! storage.put_user(User::new("9x1abc", "alice"));
//!
//! let ids = storage.find_ids(None, 100).await?;
//! ```

pub mod storage;
mod store_impl;

pub use cuttlefish_storage::{ProfileStore, StorageError, UserStore};
pub use storage::InMemoryStorage;

use cuttlefish_storage::{DynProfileStore, DynUserStore};

/// Creates a fresh in-memory backend and returns it behind both store traits.
///
/// Both handles share the same underlying maps.
pub fn create_stores() -> (InMemoryStorage, DynUserStore, DynProfileStore) {
    let storage = InMemoryStorage::new();
    let users: DynUserStore = std::sync::Arc::new(storage.clone());
    let profiles: DynProfileStore = std::sync::Arc::new(storage.clone());
    (storage, users, profiles)
}
