use axum::{Json, http::StatusCode, response::IntoResponse};
use cuttlefish_api::HealthStatus;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::ok()))
}
