//! Continuous stargazer monitoring.
//!
//! # Loops
//!
//! - The **repository loop** re-lists the user's repositories every
//!   `repo_interval` and starts a poll loop for each repository it has not
//!   seen before.
//! - Each **poll loop** fetches its repository's stargazers every
//!   `star_interval` and reconciles the store with them.
//!
//! Both loops run their first iteration immediately and then wait for the
//! next tick. Errors are logged and retried on the next tick.
//!
//! # Despawning
//!
//! After a listing that completed without error, poll loops for
//! repositories that no longer appear (deleted, or archived while archived
//! repositories are excluded) are cancelled and joined. A failed listing
//! never despawns anything.
//!
//! # Shutdown
//!
//! Every poll loop runs under a child of the monitor's cancellation token.
//! Cancelling the monitor stops the repository loop, lets each poll loop
//! finish the poll it is in, and joins them all before [`Monitor::run`]
//! returns.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{ScanError, StarSource};
use crate::notify::Notifier;
use crate::store::NotifyingStore;
use crate::types::{RepoName, Repository};

/// Default interval between repository listings (1 hour).
const DEFAULT_REPO_INTERVAL_SECS: u64 = 3600;

/// Default interval between stargazer polls of one repository (1 hour).
const DEFAULT_STAR_INTERVAL_SECS: u64 = 3600;

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing and filtering for a [`Monitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between repository listings.
    pub repo_interval: Duration,

    /// Interval between stargazer polls of each repository.
    pub star_interval: Duration,

    /// Whether archived repositories are polled.
    pub include_archived: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            repo_interval: Duration::from_secs(DEFAULT_REPO_INTERVAL_SECS),
            star_interval: Duration::from_secs(DEFAULT_STAR_INTERVAL_SECS),
            include_archived: false,
        }
    }
}

/// A running poll loop.
struct PollerHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Keeps the store in sync with GitHub on a timer.
pub struct Monitor<S, N> {
    user: String,
    source: Arc<S>,
    store: Arc<NotifyingStore<N>>,
    config: MonitorConfig,
    pollers: HashMap<RepoName, PollerHandle>,
}

impl<S, N> Monitor<S, N>
where
    S: StarSource + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        user: impl Into<String>,
        source: Arc<S>,
        store: Arc<NotifyingStore<N>>,
        mut config: MonitorConfig,
    ) -> Self {
        config.repo_interval = config.repo_interval.max(MIN_INTERVAL);
        config.star_interval = config.star_interval.max(MIN_INTERVAL);
        Monitor {
            user: user.into(),
            source,
            store,
            config,
            pollers: HashMap::new(),
        }
    }

    /// Runs until `cancel` fires, then joins every poll loop.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            user = %self.user,
            repo_interval_secs = self.config.repo_interval.as_secs(),
            star_interval_secs = self.config.star_interval.as_secs(),
            "Starting monitor"
        );

        let mut ticker = interval(self.config.repo_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.list_repos(&cancel).await {
                Ok(repos) => self.reconcile(repos, &cancel).await,
                Err(ScanError::Cancelled) => break,
                Err(e) => error!(error = %e, "Failed to list repositories"),
            }
        }

        debug!(pollers = self.pollers.len(), "Stopping poll loops");
        for (repo, poller) in self.pollers.drain() {
            poller.cancel.cancel();
            if let Err(e) = poller.task.await {
                error!(repo = %repo, error = %e, "Poll loop panicked");
            }
        }
        info!("Monitor stopped");
    }

    /// Lists the repositories that should currently be polled.
    async fn list_repos(&self, cancel: &CancellationToken) -> Result<Vec<Repository>, ScanError> {
        let mut listing = std::pin::pin!(self.source.list_user_repos(&self.user));
        let mut repos = Vec::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                next = listing.next() => next,
            };
            match next {
                Some(Ok(repo)) => {
                    if repo.archived && !self.config.include_archived {
                        continue;
                    }
                    repos.push(repo);
                }
                Some(Err(e)) => return Err(ScanError::ListRepos(e)),
                None => return Ok(repos),
            }
        }
    }

    /// Starts poll loops for new repositories and stops the ones for
    /// repositories that disappeared from the listing.
    async fn reconcile(&mut self, repos: Vec<Repository>, cancel: &CancellationToken) {
        let listed: HashSet<RepoName> = repos.iter().map(|r| r.full_name.clone()).collect();

        let gone: Vec<RepoName> = self
            .pollers
            .keys()
            .filter(|name| !listed.contains(*name))
            .cloned()
            .collect();
        for repo in gone {
            if let Some(poller) = self.pollers.remove(&repo) {
                info!(repo = %repo, "Repository no longer listed, stopping poll loop");
                poller.cancel.cancel();
                if let Err(e) = poller.task.await {
                    error!(repo = %repo, error = %e, "Poll loop panicked");
                }
            }
        }

        let mut started = 0;
        for repo in repos {
            if self.pollers.contains_key(&repo.full_name) {
                continue;
            }
            let name = repo.full_name.clone();
            let child = cancel.child_token();
            let task = tokio::spawn(poll_stargazers(
                Arc::clone(&self.source),
                Arc::clone(&self.store),
                repo,
                self.config.star_interval,
                child.clone(),
            ));
            self.pollers.insert(
                name,
                PollerHandle {
                    task,
                    cancel: child,
                },
            );
            started += 1;
        }

        debug!(
            found = listed.len(),
            started,
            polling = self.pollers.len(),
            "Repositories polled"
        );
    }
}

/// Polls one repository until cancelled.
async fn poll_stargazers<S, N>(
    source: Arc<S>,
    store: Arc<NotifyingStore<N>>,
    repo: Repository,
    period: Duration,
    cancel: CancellationToken,
) where
    S: StarSource,
    N: Notifier,
{
    debug!(repo = %repo.full_name, "Poll loop started");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // An in-flight poll runs to completion; cancellation is observed at
        // the next tick.
        match source.list_stargazers(&repo).await {
            Ok(stargazers) => {
                if let Err(e) = store.set(&repo.full_name, &stargazers).await {
                    warn!(repo = %repo.full_name, error = %e, "Failed to update stargazers");
                }
            }
            Err(e) => warn!(repo = %repo.full_name, error = %e, "Failed to fetch stargazers"),
        }
    }
    debug!(repo = %repo.full_name, "Poll loop stopped");
}
