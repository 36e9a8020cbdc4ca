//! Octocrab-backed [`StarSource`].
//!
//! Both listings request 100 records per page and follow the `next` link
//! until GitHub stops sending one. Each page request goes through
//! [`retry_with_backoff`] on its own, so a transient failure on page 7
//! does not refetch pages 1 to 6.

use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use http::header::{ACCEPT, HeaderMap, HeaderValue};
use http::Uri;
use octocrab::{Octocrab, Page, models};
use tracing::debug;

use super::error::GitHubApiError;
use super::retry::{RetryConfig, retry_with_backoff};
use crate::scanner::StarSource;
use crate::types::{Repository, Stargazer};

const RECORDS_PER_PAGE: u8 = 100;

/// Media type under which the stargazers endpoint includes `starred_at`.
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

/// Reads repositories and stargazers from the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    client: Octocrab,
    retry: RetryConfig,
}

enum Cursor {
    First,
    Next(Uri),
}

impl GitHubClient {
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            retry: RetryConfig::DEFAULT,
        }
    }

    /// Creates a client authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, GitHubApiError> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .build()
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(Self::new(client))
    }

    /// Creates an unauthenticated client, subject to the anonymous rate limit.
    pub fn anonymous() -> Result<Self, GitHubApiError> {
        let client = Octocrab::builder()
            .build()
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(Self::new(client))
    }

    async fn repos_page(
        &self,
        user: &str,
        cursor: &Cursor,
    ) -> Result<Option<Page<models::Repository>>, GitHubApiError> {
        retry_with_backoff(self.retry, "list_user_repos", || async move {
            match cursor {
                Cursor::First => self
                    .client
                    .get(
                        format!("/users/{user}/repos"),
                        Some(&[("per_page", RECORDS_PER_PAGE)]),
                    )
                    .await
                    .map(Some),
                Cursor::Next(uri) => self.client.get_page(&Some(uri.clone())).await,
            }
            .map_err(GitHubApiError::from_octocrab)
        })
        .await
    }

    async fn stargazers_page(
        &self,
        owner: &str,
        name: &str,
        cursor: &Cursor,
    ) -> Result<Option<Page<models::StarGazer>>, GitHubApiError> {
        // Every page, not just the first, needs the star media type or
        // `starred_at` is omitted.
        let route = match cursor {
            Cursor::First => {
                format!("/repos/{owner}/{name}/stargazers?per_page={RECORDS_PER_PAGE}")
            }
            Cursor::Next(uri) => uri.to_string(),
        };
        let route = route.as_str();
        retry_with_backoff(self.retry, "list_stargazers", || async move {
            self.client
                .get_with_headers(route, None::<&()>, Some(star_headers()))
                .await
                .map(Some)
                .map_err(GitHubApiError::from_octocrab)
        })
        .await
    }
}

fn star_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(STAR_MEDIA_TYPE));
    headers
}

impl StarSource for GitHubClient {
    fn list_user_repos(
        &self,
        user: &str,
    ) -> impl Stream<Item = Result<Repository, GitHubApiError>> + Send {
        stream::unfold(Some(Cursor::First), move |cursor| async move {
            let cursor = cursor?;
            let items: Vec<Result<Repository, GitHubApiError>> =
                match self.repos_page(user, &cursor).await {
                    Ok(Some(page)) => {
                        let next = page.next.map(Cursor::Next);
                        let repos = page.items.into_iter().map(repository_from).map(Ok);
                        return Some((repos.collect(), next));
                    }
                    Ok(None) => Vec::new(),
                    Err(e) => vec![Err(e)],
                };
            Some((items, None))
        })
        .flat_map(stream::iter)
    }

    async fn list_stargazers(&self, repo: &Repository) -> Result<Vec<Stargazer>, GitHubApiError> {
        let Some((owner, name)) = repo.full_name.split() else {
            return Err(GitHubApiError::permanent_without_source(format!(
                "invalid repository name: {}",
                repo.full_name
            )));
        };

        let mut stargazers = Vec::new();
        let mut cursor = Cursor::First;
        loop {
            let Some(page) = self.stargazers_page(owner, name, &cursor).await? else {
                break;
            };
            stargazers.extend(page.items.into_iter().filter_map(|s| stargazer_from(repo, s)));
            match page.next {
                Some(next) => cursor = Cursor::Next(next),
                None => break,
            }
        }

        debug!(repo = %repo.full_name, stargazers = stargazers.len(), "Fetched stargazers");
        Ok(stargazers)
    }
}

fn repository_from(repo: models::Repository) -> Repository {
    let full_name = repo.full_name.unwrap_or_else(|| match &repo.owner {
        Some(owner) => format!("{}/{}", owner.login, repo.name),
        None => repo.name.clone(),
    });
    Repository {
        full_name: full_name.into(),
        html_url: repo.html_url.map(|u| u.to_string()),
        archived: repo.archived.unwrap_or(false),
    }
}

/// Entries for deleted accounts come back without a user and are skipped.
fn stargazer_from(repo: &Repository, star: models::StarGazer) -> Option<Stargazer> {
    let user = star.user?;
    let mut stargazer = Stargazer::new(
        repo.full_name.clone(),
        user.login,
        star.starred_at.unwrap_or_else(Utc::now),
    )
    .with_user_url(user.html_url.to_string());
    if let Some(url) = &repo.html_url {
        stargazer = stargazer.with_repo_url(url.clone());
    }
    Some(stargazer)
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
