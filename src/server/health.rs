//! Readiness probe.
//!
//! The server only binds after the initial scan, so answering at all means
//! it is ready.

use axum::http::StatusCode;

/// Readiness handler for `GET /readyz`. Unauthenticated.
pub async fn readyz_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
