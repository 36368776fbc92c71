//! User profile caching.
//!
//! ## Cache Key Format
//!
//! `profile:{user_id}`, e.g. `profile:9abc1def`
//!
//! Values are MessagePack-encoded [`UserProfile`] records. The maintenance
//! routines refresh entries with `set` after rewriting a user's derived data.

use std::time::Duration;

use cuttlefish_storage::UserProfile;
use serde::Serialize;

use super::backend::{CacheBackend, CacheStats};

/// Failure to store a typed value in the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to encode cache entry {key}")]
    Encode {
        key: String,
        #[source]
        source: rmp_serde::encode::Error,
    },
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, CacheError> {
    rmp_serde::to_vec_named(value).map_err(|source| CacheError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Keyed cache of user profile records.
#[derive(Clone, Debug)]
pub struct ProfileCache {
    backend: CacheBackend,
    ttl: Duration,
}

impl ProfileCache {
    /// Create a new profile cache with the given backend and TTL.
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    #[inline]
    fn cache_key(user_id: &str) -> String {
        format!("profile:{user_id}")
    }

    /// Get a cached profile by user ID.
    pub async fn get(&self, user_id: &str) -> Option<UserProfile> {
        let key = Self::cache_key(user_id);
        let data = self.backend.get(&key).await?;
        match rmp_serde::from_slice::<UserProfile>(&data) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to deserialize cached profile");
                self.backend.invalidate(&key).await;
                None
            }
        }
    }

    /// Store `profile` under `user_id`, replacing any previous entry.
    ///
    /// On an encoding failure the previous entry is left untouched.
    pub async fn set(&self, user_id: &str, profile: &UserProfile) -> Result<(), CacheError> {
        let key = Self::cache_key(user_id);
        let data = encode(&key, profile)?;
        self.backend.set(&key, data, self.ttl).await;
        Ok(())
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.backend.invalidate(&Self::cache_key(user_id)).await;
    }

    pub fn stats(&self) -> CacheStats {
        self.backend.stats()
    }
}
