//! Webhook endpoint handler and its middleware.
//!
//! A delivery passes through three stages:
//!
//! 1. [`request_span`] opens a tracing span tagged with the hook ID, event
//!    type and user agent, so every log line below carries them
//! 2. [`require_signature`] buffers the body, checks `X-Hub-Signature-256`
//!    and hands the same bytes on
//! 3. [`webhook_handler`] decodes the `star` event and adds or deletes the
//!    stargazer through the notifying store

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use thiserror::Error;
use tracing::{Instrument, debug, error, field, info, info_span, warn};

use super::AppState;
use crate::notify::Notifier;
use crate::store::StoreError;
use crate::types::{StarAction, UnsupportedAction};
use crate::webhooks::{EventKind, SignatureError, StarEvent, verify_signature};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";
/// Header name for the ID of the hook that sent the delivery.
const HEADER_HOOK_ID: &str = "x-github-hook-id";
const HEADER_USER_AGENT: &str = "user-agent";

/// Star payloads are a few KiB; anything this large is not from GitHub.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("missing signature")]
    MissingSignature,

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    UnsupportedAction(#[from] UnsupportedAction),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature(_) => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::Body(_)
            | WebhookError::MissingHeader(_)
            | WebhookError::UnsupportedEvent(_)
            | WebhookError::InvalidJson(_)
            | WebhookError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
            WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Runs the rest of the request inside a span carrying the delivery's
/// identifying headers.
pub async fn request_span(request: Request, next: Next) -> Response {
    let span = info_span!(
        "webhook",
        hook_id = field::Empty,
        event = field::Empty,
        user_agent = field::Empty,
    );
    let headers = request.headers();
    for (header, name) in [
        (HEADER_HOOK_ID, "hook_id"),
        (HEADER_EVENT, "event"),
        (HEADER_USER_AGENT, "user_agent"),
    ] {
        if let Some(value) = header_str(headers, header) {
            span.record(name, value);
        }
    }

    next.run(request).instrument(span).await
}

/// Rejects deliveries whose body does not match `X-Hub-Signature-256`.
pub async fn require_signature<N: Notifier + 'static>(
    State(app_state): State<AppState<N>>,
    request: Request,
    next: Next,
) -> Result<Response, WebhookError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(WebhookError::Body)?;

    let Some(signature) = header_str(&parts.headers, HEADER_SIGNATURE) else {
        warn!("Webhook delivery without signature");
        return Err(WebhookError::MissingSignature);
    };
    if let Err(e) = verify_signature(&bytes, signature, app_state.webhook_secret()) {
        warn!(error = %e, "Invalid webhook signature");
        return Err(e.into());
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Webhook handler for `POST /`.
///
/// # Response
///
/// - 200 OK: star recorded (or already known), or `ping` acknowledged
/// - 400 Bad Request: missing/unsupported event type, invalid JSON, or an
///   action other than `created`/`deleted`
/// - 401 Unauthorized: missing or invalid signature (from [`require_signature`])
/// - 500 Internal Server Error: the store failed to persist
pub async fn webhook_handler<N: Notifier + 'static>(
    State(app_state): State<AppState<N>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    let event =
        header_str(&headers, HEADER_EVENT).ok_or(WebhookError::MissingHeader(HEADER_EVENT))?;
    match EventKind::from_header(event) {
        EventKind::Star => {}
        EventKind::Ping => {
            info!("Ping received");
            return Ok(StatusCode::OK);
        }
        EventKind::Other(other) => {
            warn!(event = %other, "Unsupported event");
            return Err(WebhookError::UnsupportedEvent(other));
        }
    }

    let event = StarEvent::parse(&body).inspect_err(|e| {
        warn!(error = %e, "Unable to parse star event");
    })?;
    let action = event.action().inspect_err(|e| {
        warn!(action = %e.0, "Unsupported action");
    })?;
    let stargazer = event.stargazer(Utc::now());
    let repo = stargazer.repo.clone();

    debug!(
        repo = %repo,
        user = %stargazer.login,
        action = %action,
        "Star event received"
    );

    let store = app_state.store();
    let changed = match action {
        StarAction::Created => store.add(&repo, std::slice::from_ref(&stargazer)).await,
        StarAction::Deleted => store.delete(&repo, std::slice::from_ref(&stargazer)).await,
    }
    .inspect_err(|e| {
        error!(repo = %repo, error = %e, "Unable to store star");
    })?;

    debug!(repo = %repo, changed = !changed.is_empty(), "Star event applied");
    Ok(StatusCode::OK)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
