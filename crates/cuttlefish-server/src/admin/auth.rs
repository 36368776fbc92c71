//! Admin authentication extractor.
//!
//! ```ignore
//! async fn admin_handler(admin: AdminAuth) -> String {
//!     format!("Hello admin: {}!", admin.username)
//! }
//! ```

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use cuttlefish_api::ApiError;

use super::state::AdminState;

/// Authenticated administrator.
///
/// Resolves `Authorization: Bearer <token>` to a user through the user
/// store and requires the admin flag. Native user tokens carry every
/// permission kind, so no per-kind check follows.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub user_id: String,
    pub username: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AdminState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let admin_state = AdminState::from_ref(state);

        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let user = admin_state
            .users
            .find_by_token(token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to resolve credential");
                ApiError::internal("Failed to resolve credential")
            })?
            .ok_or_else(|| {
                tracing::debug!("Admin access denied: unknown token");
                ApiError::unauthorized("Invalid credential")
            })?;

        if !user.is_admin {
            tracing::debug!(
                user_id = %user.id,
                username = %user.username,
                "Admin access denied: not an administrator"
            );
            return Err(ApiError::forbidden("Admin access required"));
        }

        tracing::debug!(user_id = %user.id, username = %user.username, "Admin access granted");

        Ok(Self {
            user_id: user.id,
            username: user.username,
        })
    }
}
