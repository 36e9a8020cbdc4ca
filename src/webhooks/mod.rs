//! Webhook payloads and authentication.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Typed `star` event payloads

pub mod events;
pub mod signature;

pub use events::{EventKind, EventRepository, EventUser, StarEvent};
pub use signature::{
    SignatureError, compute_signature, format_signature_header, parse_signature_header,
    verify_signature,
};
