//! HTTP handlers.

pub mod bookings;
pub mod orders;
pub mod payments;
pub mod registrations;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "registration-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
