//! GitHub API error types.
//!
//! Errors are split into two kinds so the retry loop knows what to do:
//!
//! - **Transient** errors are retried with backoff (5xx, 429, rate limits,
//!   network failures)
//! - **Permanent** errors are returned immediately (404 for a deleted
//!   repository, 401 for a bad token, and the remaining 4xx)

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Safe to retry with backoff.
    Transient,

    /// Retrying will not help.
    Permanent,
}

impl GitHubErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if the request got as far as a response.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_retriable()
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let (status_code, message) = match &err {
            octocrab::Error::GitHub { source, .. } => {
                (Some(source.status_code.as_u16()), source.message.clone())
            }
            other => (None, other.to_string()),
        };

        Self {
            kind: classify(status_code, &message),
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// Phrases GitHub uses in 403 bodies when the request was throttled rather
/// than forbidden.
const THROTTLE_MARKERS: &[&str] = &["rate limit", "abuse detection", "retry later"];

/// Phrases in transport errors (no HTTP response at all) worth retrying.
const NETWORK_MARKERS: &[&str] = &["timed out", "timeout", "connection", "dns", "network"];

fn mentions_any(message: &str, markers: &[&str]) -> bool {
    let message = message.to_ascii_lowercase();
    markers.iter().any(|marker| message.contains(marker))
}

/// Decides whether a failed request is worth retrying.
fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    let transient = match status_code {
        Some(429) => true,
        Some(403) => mentions_any(message, THROTTLE_MARKERS),
        Some(code) => (500..600).contains(&code),
        None => mentions_any(message, NETWORK_MARKERS),
    };
    if transient {
        GitHubErrorKind::Transient
    } else {
        GitHubErrorKind::Permanent
    }
}
