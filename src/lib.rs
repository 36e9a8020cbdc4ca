//! GitHub Stars - tracks who has starred a user's repositories.
//!
//! Stars arrive from two directions: periodic scans of the GitHub API and
//! `star` webhook deliveries. Both feed a single store that reconciles them
//! and reports every star gained or lost exactly once to the configured
//! notifiers.

pub mod config;
pub mod github;
pub mod notify;
pub mod persistence;
pub mod scanner;
pub mod server;
pub mod store;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
