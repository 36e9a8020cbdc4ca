//! HTTP server for GitHub webhook deliveries.
//!
//! # Endpoints
//!
//! - `POST /` - Accepts signed `star` (and `ping`) deliveries
//! - `GET /readyz` - Returns 200 once the server is listening
//!
//! Only `POST /` sits behind signature verification; the readiness probe is
//! open.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};

use crate::notify::Notifier;
use crate::store::NotifyingStore;

pub mod health;
pub mod webhook;

pub use health::readyz_handler;
pub use webhook::{WebhookError, webhook_handler};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<N> {
    inner: Arc<AppStateInner<N>>,
}

struct AppStateInner<N> {
    store: Arc<NotifyingStore<N>>,

    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,
}

// Derived Clone would require `N: Clone`.
impl<N> Clone for AppState<N> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N> AppState<N> {
    pub fn new(store: Arc<NotifyingStore<N>>, webhook_secret: impl Into<Vec<u8>>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                store,
                webhook_secret: webhook_secret.into(),
            }),
        }
    }

    pub fn store(&self) -> &NotifyingStore<N> {
        &self.inner.store
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<N: Notifier + 'static>(app_state: AppState<N>) -> axum::Router {
    let webhooks = axum::Router::new()
        .route("/", post(webhook_handler::<N>))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            webhook::require_signature::<N>,
        ))
        .route_layer(middleware::from_fn(webhook::request_span));

    webhooks
        .route("/readyz", get(readyz_handler))
        .with_state(app_state)
}
