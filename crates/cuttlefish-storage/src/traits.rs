//! Storage traits for the Cuttlefish storage abstraction layer.
//!
//! This module defines the collaborator traits that storage backends implement.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{UpdateResult, User, UserImageUpdate, UserProfile, UserWithImages};

/// Read/write access to user rows.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use cuttlefish_storage::{StorageError, UserStore};
///
/// async fn count_users(store: &dyn UserStore) -> Result<usize, StorageError> {
///     let mut total = 0;
///     let mut after = None;
///     loop {
///         let page = store.find_ids(after.as_deref(), 500).await?;
///         if page.is_empty() {
///             return Ok(total);
///         }
///         total += page.len();
///         after = page.last().cloned();
///     }
/// }
/// ```
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns up to `limit` user identifiers in ascending order, strictly
    /// greater than `after` when given.
    ///
    /// Only identifiers are loaded so that scanning every user stays cheap.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn find_ids(&self, after: Option<&str>, limit: usize)
    -> Result<Vec<String>, StorageError>;

    /// Loads a user together with its avatar and banner drive files.
    ///
    /// Returns `None` if the user does not exist. A file reference that
    /// points to a missing file loads as `None` for that slot.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing users.
    async fn find_with_images(&self, id: &str) -> Result<Option<UserWithImages>, StorageError>;

    /// Writes the derived image fields of one user.
    ///
    /// A missing user is not an error; it is reported as zero affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn update_images(
        &self,
        id: &str,
        update: &UserImageUpdate,
    ) -> Result<UpdateResult, StorageError>;

    /// Resolves a native API credential to its user.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn find_by_token(&self, token: &str) -> Result<Option<User>, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Read access to per-user profile records.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads the profile owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist.
    async fn find_by_user_id_or_fail(&self, user_id: &str) -> Result<UserProfile, StorageError>;
}
