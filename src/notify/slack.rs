//! Slack incoming-webhook notification sink.
//!
//! Posts one message per repository and direction, e.g.
//!
//! ```text
//! Repo <https://github.com/foo/bar|foo/bar> received a star from 2 users: <https://github.com/a|@a>, <https://github.com/b|@b>
//! ```
//!
//! When more users than `maximum_users` arrive at once, only the count is
//! posted.

use serde::Serialize;
use tracing::{debug, warn};

use super::Notifier;
use crate::types::{Direction, RepoName, Stargazer};

/// Default for [`SlackNotifier::maximum_users`].
pub const DEFAULT_MAXIMUM_USERS: usize = 5;

/// Posts notifications to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: String,
    maximum_users: usize,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
    unfurl_links: bool,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        SlackNotifier {
            webhook_url: webhook_url.into(),
            maximum_users: DEFAULT_MAXIMUM_USERS,
            client: reqwest::Client::new(),
        }
    }

    /// Sets how many users are listed by name before only the count is shown.
    ///
    /// Zero selects the default.
    pub fn with_maximum_users(mut self, maximum_users: usize) -> Self {
        self.maximum_users = if maximum_users == 0 {
            DEFAULT_MAXIMUM_USERS
        } else {
            maximum_users
        };
        self
    }

    pub fn maximum_users(&self) -> usize {
        self.maximum_users
    }

    fn make_message(
        &self,
        direction: Direction,
        repo: &RepoName,
        stargazers: &[Stargazer],
    ) -> String {
        let repo_url = stargazers.iter().find_map(|s| s.repo_url.as_deref());
        let repo_name = match repo_url {
            Some(url) => format!("<{url}|{repo}>"),
            None => repo.to_string(),
        };

        let mut user_list = String::new();
        if stargazers.len() > 1 {
            user_list = format!("{} users", stargazers.len());
        }
        if stargazers.len() <= self.maximum_users {
            if stargazers.len() > 1 {
                user_list.push_str(": ");
            }
            let users: Vec<String> = stargazers.iter().map(format_user).collect();
            user_list.push_str(&users.join(", "));
        }

        let verb = match direction {
            Direction::Gained => "received",
            Direction::Lost => "lost",
        };
        format!("Repo {repo_name} {verb} a star from {user_list}")
    }

    async fn post(&self, text: &str) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.webhook_url)
            .json(&WebhookMessage {
                text,
                unfurl_links: false,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Notifier for SlackNotifier {
    async fn notify(&self, direction: Direction, repo: &RepoName, stargazers: &[Stargazer]) {
        if stargazers.is_empty() {
            return;
        }
        let text = self.make_message(direction, repo, stargazers);
        match self.post(&text).await {
            Ok(()) => debug!(repo = %repo, "Posted Slack notification"),
            Err(e) => warn!(repo = %repo, error = %e, "Failed to post Slack notification"),
        }
    }
}

fn format_user(star: &Stargazer) -> String {
    match &star.user_url {
        Some(url) => format!("<{}|@{}>", url, star.login),
        None => star.login.to_string(),
    }
}
