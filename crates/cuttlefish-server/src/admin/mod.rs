//! Admin API endpoints.
//!
//! # Endpoints
//!
//! - `POST /recreate-url-cache` - Recompute avatar/banner URLs and blur-hashes of all users
//!
//! Every route requires an administrator credential via the [`AdminAuth`] extractor.

pub mod auth;
pub mod state;

pub use auth::AdminAuth;
pub use state::AdminState;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::routing::post;
use cuttlefish_api::ApiError;
use serde::Deserialize;

/// Permission kind declared by `POST /recreate-url-cache`.
pub const RECREATE_URL_CACHE_KIND: &str = "write:admin:meta";

/// Request body of `POST /recreate-url-cache`; takes no parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecreateUrlCacheRequest {}

/// Creates the admin routes.
pub fn admin_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AdminState: FromRef<S>,
{
    Router::new().route("/recreate-url-cache", post(recreate_url_cache))
}

/// Handler for `POST /api/admin/recreate-url-cache`.
pub async fn recreate_url_cache(
    State(state): State<AdminState>,
    admin: AdminAuth,
    body: Result<Json<RecreateUrlCacheRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(_params) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    tracing::info!(
        user_id = %admin.user_id,
        kind = RECREATE_URL_CACHE_KIND,
        "URL cache recreation requested"
    );

    state.url_cache.run().await.map_err(|e| {
        tracing::error!(error = %e, user_id = %admin.user_id, "URL cache recreation failed");
        ApiError::internal(e.to_string())
    })?;

    Ok(StatusCode::NO_CONTENT)
}
