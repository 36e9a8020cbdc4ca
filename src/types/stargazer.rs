//! Stargazer and repository records exchanged between the scanner, the
//! webhook layer, the store and the notifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{Login, RepoName};

/// The action carried by a `star` webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarAction {
    Created,
    Deleted,
}

impl StarAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StarAction::Created => "created",
            StarAction::Deleted => "deleted",
        }
    }
}

impl fmt::Display for StarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an action GitHub sent that we don't handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported action: {0}")]
pub struct UnsupportedAction(pub String);

impl FromStr for StarAction {
    type Err = UnsupportedAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(StarAction::Created),
            "deleted" => Ok(StarAction::Deleted),
            other => Err(UnsupportedAction(other.to_string())),
        }
    }
}

/// Whether a notification reports stars gained or stars lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Gained,
    Lost,
}

/// One user's star on one repository.
///
/// `action` is only set on the webhook path; the store never persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stargazer {
    pub repo: RepoName,
    pub login: Login,
    pub starred_at: DateTime<Utc>,
    pub repo_url: Option<String>,
    pub user_url: Option<String>,
    pub action: Option<StarAction>,
}

impl Stargazer {
    pub fn new(
        repo: impl Into<RepoName>,
        login: impl Into<Login>,
        starred_at: DateTime<Utc>,
    ) -> Self {
        Stargazer {
            repo: repo.into(),
            login: login.into(),
            starred_at,
            repo_url: None,
            user_url: None,
            action: None,
        }
    }

    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    pub fn with_user_url(mut self, url: impl Into<String>) -> Self {
        self.user_url = Some(url.into());
        self
    }

    pub fn with_action(mut self, action: StarAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// A repository as returned by the repository listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub full_name: RepoName,
    pub html_url: Option<String>,
    pub archived: bool,
}

impl Repository {
    pub fn new(full_name: impl Into<RepoName>) -> Self {
        Repository {
            full_name: full_name.into(),
            html_url: None,
            archived: false,
        }
    }

    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    pub fn with_html_url(mut self, url: impl Into<String>) -> Self {
        self.html_url = Some(url.into());
        self
    }
}
