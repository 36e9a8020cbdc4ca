//! A store decorator that reports every delta to a [`Notifier`].

use tracing::warn;

use super::{Changes, Result, Store, StoreError};
use crate::notify::Notifier;
use crate::types::{Direction, RepoName, Stargazer};

/// Wraps a [`Store`] and notifies about every star gained or lost.
///
/// Notification happens after the in-memory mutation, including when the
/// disk write failed: the changes already took effect, so they are reported
/// and the persist error is returned afterwards.
///
/// Notifications are sent after the store lock is released. Concurrent
/// mutations of the same repository may therefore notify out of order.
#[derive(Debug)]
pub struct NotifyingStore<N> {
    store: Store,
    notifier: N,
}

impl<N: Notifier> NotifyingStore<N> {
    pub fn new(store: Store, notifier: N) -> Self {
        NotifyingStore { store, notifier }
    }

    /// The wrapped store, for read access.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// [`Store::add`], then notifies about the new stargazers.
    pub async fn add(&self, repo: &RepoName, stargazers: &[Stargazer]) -> Result<Vec<Stargazer>> {
        match self.store.add(repo, stargazers).await {
            Ok(added) => {
                self.report(Direction::Gained, repo, &added).await;
                Ok(added)
            }
            Err(e) => Err(self.report_persisted(repo, e).await),
        }
    }

    /// [`Store::delete`], then notifies about the removed stargazers.
    pub async fn delete(
        &self,
        repo: &RepoName,
        stargazers: &[Stargazer],
    ) -> Result<Vec<Stargazer>> {
        match self.store.delete(repo, stargazers).await {
            Ok(removed) => {
                self.report(Direction::Lost, repo, &removed).await;
                Ok(removed)
            }
            Err(e) => Err(self.report_persisted(repo, e).await),
        }
    }

    /// [`Store::set`], then notifies about both sides of the diff.
    pub async fn set(&self, repo: &RepoName, stargazers: &[Stargazer]) -> Result<Changes> {
        match self.store.set(repo, stargazers).await {
            Ok(changes) => {
                self.report_changes(repo, &changes).await;
                Ok(changes)
            }
            Err(e) => Err(self.report_persisted(repo, e).await),
        }
    }

    async fn report(&self, direction: Direction, repo: &RepoName, stargazers: &[Stargazer]) {
        if !stargazers.is_empty() {
            self.notifier.notify(direction, repo, stargazers).await;
        }
    }

    async fn report_changes(&self, repo: &RepoName, changes: &Changes) {
        self.report(Direction::Gained, repo, &changes.added).await;
        self.report(Direction::Lost, repo, &changes.removed).await;
    }

    /// Reports what a failed write still applied in memory, and hands the
    /// error back.
    async fn report_persisted(&self, repo: &RepoName, error: StoreError) -> StoreError {
        if let StoreError::Persist { changes, .. } = &error {
            warn!(repo = %repo, error = %error, "Notifying about unpersisted changes");
            self.report_changes(repo, changes).await;
        }
        error
    }
}
