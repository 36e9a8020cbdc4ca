//! Structured-log notification sink.

use tracing::info;

use super::Notifier;
use crate::types::{Direction, RepoName, Stargazer};

/// Logs one `info` event per repository and direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, direction: Direction, repo: &RepoName, stargazers: &[Stargazer]) {
        let count = stargazers.len();
        info!(repo = %repo, stargazers = count, "{}", log_message(direction, count));
    }
}

fn log_message(direction: Direction, count: usize) -> String {
    match direction {
        Direction::Gained => format!("repo has {count} new stargazers"),
        Direction::Lost => format!("repo lost {count} stargazers"),
    }
}
