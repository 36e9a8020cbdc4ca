//! Core domain types for the stargazer tracker.

pub mod ids;
pub mod stargazer;

pub use ids::{Login, RepoName};
pub use stargazer::{Direction, Repository, StarAction, Stargazer, UnsupportedAction};
