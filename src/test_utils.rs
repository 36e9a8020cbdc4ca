//! Shared test fakes and arbitrary generators for property-based testing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::DateTime;
use futures::stream::{self, Stream, StreamExt};
use proptest::prelude::*;

use crate::github::GitHubApiError;
use crate::notify::Notifier;
use crate::persistence::{StarDatabase, StarRecord};
use crate::scanner::StarSource;
use crate::types::{Direction, Login, RepoName, Repository, Stargazer};

/// Timestamp used by [`star`], so equal inputs give equal stargazers.
pub const STARRED_AT: i64 = 1_700_000_000;

pub fn star(repo: &str, login: &str) -> Stargazer {
    star_at(repo, login, STARRED_AT)
}

pub fn star_at(repo: &str, login: &str, secs: i64) -> Stargazer {
    let starred_at = DateTime::from_timestamp(secs, 0).unwrap();
    Stargazer::new(repo, login, starred_at)
}

// ─── Generators ───

pub fn arb_repo_name() -> impl Strategy<Value = RepoName> {
    "[a-z][a-z0-9-]{0,8}/[a-z][a-z0-9._-]{0,12}".prop_map(RepoName::from)
}

pub fn arb_login() -> impl Strategy<Value = Login> {
    "[a-zA-Z0-9][a-zA-Z0-9-]{0,15}".prop_map(Login::from)
}

pub fn arb_star_record() -> impl Strategy<Value = StarRecord> {
    (0i64..4_000_000_000).prop_map(|secs| StarRecord {
        starred_at: DateTime::from_timestamp(secs, 0).unwrap(),
    })
}

pub fn arb_star_database() -> impl Strategy<Value = StarDatabase> {
    prop::collection::btree_map(
        arb_repo_name(),
        prop::collection::btree_map(arb_login(), arb_star_record(), 0..6),
        0..5,
    )
}

// ─── Recording Notifier ───

/// One `notify` call: direction, repository and the stargazers passed.
pub type Notification = (Direction, RepoName, Vec<Stargazer>);

/// Notifier that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().unwrap().clone()
    }

    /// Logins notified for `direction`, flattened across calls.
    pub fn logins(&self, direction: Direction) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(d, _, _)| *d == direction)
            .flat_map(|(_, _, stars)| stars.into_iter().map(|s| s.login.to_string()))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, direction: Direction, repo: &RepoName, stargazers: &[Stargazer]) {
        self.calls
            .lock()
            .unwrap()
            .push((direction, repo.clone(), stargazers.to_vec()));
    }
}

// ─── Fake Source ───

#[derive(Debug, Default)]
struct FakeState {
    repo_pages: Vec<Vec<Repository>>,
    listing_error: Option<String>,
    stargazers: HashMap<RepoName, Result<Vec<Stargazer>, String>>,
    stargazer_delay: Option<Duration>,
    list_calls: usize,
    pages_fetched: usize,
    stargazer_calls: HashMap<RepoName, usize>,
}

/// In-memory [`StarSource`].
///
/// Repositories are served in pages, each page linking to the next one
/// the way GitHub's `next` link does. Stargazer lists and failures are
/// configured per repository.
#[derive(Debug, Default)]
pub struct FakeSource {
    state: Mutex<FakeState>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Appends a page of repositories to the listing.
    pub fn with_page(self, page: Vec<Repository>) -> Self {
        self.state().repo_pages.push(page);
        self
    }

    pub fn with_stargazers(self, repo: &str, stargazers: Vec<Stargazer>) -> Self {
        self.set_stargazers(repo, stargazers);
        self
    }

    /// Replaces the whole listing with a single page.
    pub fn set_repos(&self, repos: Vec<Repository>) {
        self.state().repo_pages = vec![repos];
    }

    pub fn set_stargazers(&self, repo: &str, stargazers: Vec<Stargazer>) {
        self.state()
            .stargazers
            .insert(RepoName::from(repo), Ok(stargazers));
    }

    /// Makes every stargazer fetch for `repo` fail with a transient error.
    pub fn fail_stargazers(&self, repo: &str, message: &str) {
        self.state()
            .stargazers
            .insert(RepoName::from(repo), Err(message.to_string()));
    }

    /// Makes the listing fail after its last page.
    pub fn fail_listing(&self, message: &str) {
        self.state().listing_error = Some(message.to_string());
    }

    /// Delays every stargazer fetch.
    pub fn set_stargazer_delay(&self, delay: Duration) {
        self.state().stargazer_delay = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn pages_fetched(&self) -> usize {
        self.state().pages_fetched
    }

    pub fn stargazer_calls(&self, repo: &str) -> usize {
        self.state()
            .stargazer_calls
            .get(&RepoName::from(repo))
            .copied()
            .unwrap_or(0)
    }
}

impl StarSource for FakeSource {
    fn list_user_repos(
        &self,
        _user: &str,
    ) -> impl Stream<Item = Result<Repository, GitHubApiError>> + Send {
        let (pages, error) = {
            let mut state = self.state();
            state.list_calls += 1;
            (state.repo_pages.clone(), state.listing_error.clone())
        };

        stream::unfold(Some(0usize), move |cursor| {
            let page = cursor.and_then(|index| {
                self.state().pages_fetched += 1;
                match pages.get(index) {
                    Some(repos) => {
                        let has_next = index + 1 < pages.len() || error.is_some();
                        let items: Vec<_> = repos.iter().cloned().map(Ok).collect();
                        Some((items, has_next.then_some(index + 1)))
                    }
                    None => error.as_ref().map(|message| {
                        (
                            vec![Err(GitHubApiError::transient_without_source(message.clone()))],
                            None,
                        )
                    }),
                }
            });
            futures::future::ready(page)
        })
        .flat_map(stream::iter)
    }

    async fn list_stargazers(&self, repo: &Repository) -> Result<Vec<Stargazer>, GitHubApiError> {
        let (result, delay) = {
            let mut state = self.state();
            *state
                .stargazer_calls
                .entry(repo.full_name.clone())
                .or_default() += 1;
            let result = state
                .stargazers
                .get(&repo.full_name)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()));
            (result, state.stargazer_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        result.map_err(GitHubApiError::transient_without_source)
    }
}
