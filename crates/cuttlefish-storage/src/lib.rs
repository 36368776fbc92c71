//! # cuttlefish-storage
//!
//! Storage abstraction layer for the Cuttlefish server.
//!
//! This crate defines the traits and types that all storage backends must implement.
//! It does not contain any implementations - those are provided by separate crates.
//!
//! ## Overview
//!
//! - [`UserStore`]: identifier scans, user rows with their image files,
//!   derived image field updates and credential lookup
//! - [`ProfileStore`]: per-user profile records
//!
//! ## Storage Backends
//!
//! ```ignore
//! use async_trait::async_trait;
//! use cuttlefish_storage::{ProfileStore, StorageError, UserProfile};
//!
//! struct MyProfiles;
//!
//! #[async_trait]
//! impl ProfileStore for MyProfiles {
//!     async fn find_by_user_id_or_fail(&self, user_id: &str) -> Result<UserProfile, StorageError> {
//!         Err(StorageError::not_found("UserProfile", user_id))
//!     }
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{ProfileStore, UserStore};
pub use types::{
    DerivedImage, DriveFile, UpdateResult, User, UserImageUpdate, UserProfile, UserWithImages,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared user store trait object.
pub type DynUserStore = std::sync::Arc<dyn UserStore>;

/// Type alias for a shared profile store trait object.
pub type DynProfileStore = std::sync::Arc<dyn ProfileStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use cuttlefish_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::{ProfileStore, UserStore};
    pub use crate::types::{
        DerivedImage, DriveFile, UpdateResult, User, UserImageUpdate, UserProfile, UserWithImages,
    };
    pub use crate::{DynProfileStore, DynUserStore, StorageResult};
}
