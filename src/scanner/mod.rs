//! Full reconciliation of a user's repositories against GitHub.
//!
//! # One-shot Scan
//!
//! [`scan`] lists the user's repositories and, for every repository that is
//! not skipped, fetches the complete stargazer list and hands it to
//! [`NotifyingStore::set`]. Repositories are processed concurrently, one task
//! each:
//!
//! ```text
//! list_user_repos ──► repo A ──► spawn(list_stargazers(A) ──► set(A))
//!                 ──► repo B ──► spawn(list_stargazers(B) ──► set(B))
//!                 ──► ...
//!                                      join all ──► first error wins
//! ```
//!
//! A scan never returns while one of its tasks is still running, even on
//! error or cancellation.
//!
//! # Continuous Monitoring
//!
//! [`Monitor`] repeats the same work on a timer, with one long-lived poll
//! loop per repository.

mod monitor;

pub use monitor::{Monitor, MonitorConfig};

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::github::GitHubApiError;
use crate::notify::Notifier;
use crate::store::{NotifyingStore, StoreError};
use crate::types::{RepoName, Repository, Stargazer};

/// Where repositories and their stargazers come from.
///
/// [`GitHubClient`](crate::github::GitHubClient) is the production
/// implementation. Tests use an in-memory source.
pub trait StarSource: Send + Sync {
    /// Lists every repository owned by `user`, paging transparently.
    ///
    /// A failed page is yielded as an `Err` item; nothing follows it.
    fn list_user_repos(
        &self,
        user: &str,
    ) -> impl Stream<Item = std::result::Result<Repository, GitHubApiError>> + Send;

    /// Fetches the complete stargazer list of a repository.
    fn list_stargazers(
        &self,
        repo: &Repository,
    ) -> impl Future<Output = std::result::Result<Vec<Stargazer>, GitHubApiError>> + Send;
}

/// Errors that end a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to list repositories: {0}")]
    ListRepos(#[source] GitHubApiError),

    #[error("failed to fetch stargazers for {repo}: {source}")]
    Stargazers {
        repo: RepoName,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to update stargazers for {repo}: {source}")]
    Store {
        repo: RepoName,
        #[source]
        source: StoreError,
    },

    #[error("scan cancelled")]
    Cancelled,

    #[error("scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Counts reported by a completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Repositories returned by the listing.
    pub found: usize,
    /// Repositories whose stargazers were fetched.
    pub scanned: usize,
}

/// Reconciles the store with the current stargazers of every repository
/// owned by `user`.
///
/// Archived repositories are skipped unless `include_archived` is set.
/// Returns the first error any repository hit; the remaining repositories
/// are still processed to completion.
pub async fn scan<S, N>(
    user: &str,
    source: &Arc<S>,
    store: &Arc<NotifyingStore<N>>,
    include_archived: bool,
    cancel: &CancellationToken,
) -> Result<ScanSummary>
where
    S: StarSource + 'static,
    N: Notifier + 'static,
{
    let mut summary = ScanSummary::default();
    let mut first_error = None;
    let mut tasks = JoinSet::new();

    {
        let mut repos = pin!(source.list_user_repos(user));
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    first_error = Some(ScanError::Cancelled);
                    break;
                }
                next = repos.next() => next,
            };
            let repo = match next {
                Some(Ok(repo)) => repo,
                Some(Err(e)) => {
                    first_error = Some(ScanError::ListRepos(e));
                    break;
                }
                None => break,
            };

            summary.found += 1;
            debug!(repo = %repo.full_name, archived = repo.archived, "Repository found");
            if repo.archived && !include_archived {
                continue;
            }

            summary.scanned += 1;
            tasks.spawn(scan_repo(
                Arc::clone(source),
                Arc::clone(store),
                repo,
                cancel.clone(),
            ));
        }
    }

    while let Some(joined) = tasks.join_next().await {
        let Err(e) = joined.map_err(ScanError::from).and_then(|r| r) else {
            continue;
        };
        if first_error.is_none() {
            first_error = Some(e);
        } else {
            warn!(error = %e, "Additional scan failure");
        }
    }

    debug!(found = summary.found, scanned = summary.scanned, "Scan finished");
    match first_error {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Fetches one repository's stargazers and reconciles the store with them.
pub async fn scan_repo<S, N>(
    source: Arc<S>,
    store: Arc<NotifyingStore<N>>,
    repo: Repository,
    cancel: CancellationToken,
) -> Result<()>
where
    S: StarSource,
    N: Notifier,
{
    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ScanError::Cancelled),
        fetched = source.list_stargazers(&repo) => fetched,
    };
    let stargazers = fetched.map_err(|source| ScanError::Stargazers {
        repo: repo.full_name.clone(),
        source,
    })?;

    store
        .set(&repo.full_name, &stargazers)
        .await
        .map_err(|source| ScanError::Store {
            repo: repo.full_name.clone(),
            source,
        })?;
    Ok(())
}
