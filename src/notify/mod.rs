//! Notification sinks for stars gained and lost.
//!
//! The notifying store hands every non-empty delta to a [`Notifier`], one call
//! per repository per direction. Notifiers are side-effect only: they never
//! touch the store, and failures (e.g. Slack being unreachable) are logged and
//! swallowed so they cannot fail the write that triggered them.
//!
//! The production chain is a [`Notifiers`] list of [`Sink`]s, called
//! sequentially. Tests plug in their own `Notifier` implementations.

use std::future::Future;

use crate::types::{Direction, RepoName, Stargazer};

pub mod log;
pub mod slack;

pub use log::LogNotifier;
pub use slack::{DEFAULT_MAXIMUM_USERS, SlackNotifier};

/// Receives the stars a repository gained or lost.
pub trait Notifier: Send + Sync {
    /// Reports `stargazers` (all belonging to `repo`) as gained or lost.
    ///
    /// Must not fail: implementations log their own errors.
    fn notify(
        &self,
        direction: Direction,
        repo: &RepoName,
        stargazers: &[Stargazer],
    ) -> impl Future<Output = ()> + Send;
}

/// One of the built-in notification sinks.
#[derive(Debug, Clone)]
pub enum Sink {
    Log(LogNotifier),
    Slack(SlackNotifier),
}

impl From<LogNotifier> for Sink {
    fn from(n: LogNotifier) -> Self {
        Sink::Log(n)
    }
}

impl From<SlackNotifier> for Sink {
    fn from(n: SlackNotifier) -> Self {
        Sink::Slack(n)
    }
}

impl Notifier for Sink {
    async fn notify(&self, direction: Direction, repo: &RepoName, stargazers: &[Stargazer]) {
        match self {
            Sink::Log(n) => n.notify(direction, repo, stargazers).await,
            Sink::Slack(n) => n.notify(direction, repo, stargazers).await,
        }
    }
}

/// A chain of sinks, each invoked in turn.
#[derive(Debug, Clone, Default)]
pub struct Notifiers(Vec<Sink>);

impl Notifiers {
    pub fn new() -> Self {
        Notifiers(Vec::new())
    }

    /// Appends a sink to the chain.
    pub fn with(mut self, sink: impl Into<Sink>) -> Self {
        self.0.push(sink.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Notifier for Notifiers {
    async fn notify(&self, direction: Direction, repo: &RepoName, stargazers: &[Stargazer]) {
        for sink in &self.0 {
            sink.notify(direction, repo, stargazers).await;
        }
    }
}
