//! Admin API state.

use cuttlefish_storage::DynUserStore;

use crate::operations::ImageUrlReconciler;

/// Application state for admin endpoints.
///
/// Made available to admin handlers and the [`AdminAuth`](super::AdminAuth)
/// extractor via `FromRef`.
#[derive(Clone)]
pub struct AdminState {
    /// User store used to resolve bearer credentials.
    pub users: DynUserStore,

    /// Image URL maintenance routine.
    pub url_cache: ImageUrlReconciler,
}

impl AdminState {
    #[must_use]
    pub fn new(users: DynUserStore, url_cache: ImageUrlReconciler) -> Self {
        Self { users, url_cache }
    }
}
