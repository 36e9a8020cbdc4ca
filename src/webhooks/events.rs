//! GitHub webhook event types.
//!
//! Only two event types are handled:
//!
//! - `star` - a user starred (`created`) or unstarred (`deleted`) a repository
//! - `ping` - sent once when the hook is created; acknowledged and ignored

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{StarAction, Stargazer, UnsupportedAction};

/// The event type named by the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Star,
    Ping,
    Other(String),
}

impl EventKind {
    pub fn from_header(value: &str) -> Self {
        match value {
            "star" => EventKind::Star,
            "ping" => EventKind::Ping,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// The payload of a `star` event.
///
/// `starred_at` is null on `deleted` events and occasionally on `created`
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StarEvent {
    pub action: String,
    #[serde(default)]
    pub starred_at: Option<DateTime<Utc>>,
    pub repository: EventRepository,
    pub sender: EventUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventRepository {
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventUser {
    pub login: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl StarEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn action(&self) -> Result<StarAction, UnsupportedAction> {
        self.action.parse()
    }

    /// Converts the event into the stargazer it adds or removes.
    ///
    /// A missing `starred_at` falls back to `received_at`.
    pub fn stargazer(&self, received_at: DateTime<Utc>) -> Stargazer {
        let mut stargazer = Stargazer::new(
            self.repository.full_name.as_str(),
            self.sender.login.as_str(),
            self.starred_at.unwrap_or(received_at),
        );
        if let Some(url) = &self.repository.html_url {
            stargazer = stargazer.with_repo_url(url.clone());
        }
        if let Some(url) = &self.sender.html_url {
            stargazer = stargazer.with_user_url(url.clone());
        }
        if let Ok(action) = self.action() {
            stargazer = stargazer.with_action(action);
        }
        stargazer
    }
}
