//! GitHub REST API access.
//!
//! Provides [`GitHubClient`], the production [`StarSource`](crate::scanner::StarSource):
//!
//! - Lists a user's repositories and a repository's stargazers, 100 per page
//! - Retries transient failures with exponential backoff
//! - Distinguishes transient vs permanent errors

mod client;
mod error;
mod retry;

pub use client::GitHubClient;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use retry::{RetryConfig, retry_with_backoff};
