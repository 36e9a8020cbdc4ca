//! Newtype wrappers for GitHub identifiers.
//!
//! These keep repository names and user logins from being swapped by accident
//! when both travel as strings (they are both map keys in the store).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A repository's full name (`owner/name`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn new(s: impl Into<String>) -> Self {
        RepoName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the full name into `(owner, name)`.
    ///
    /// Returns `None` if there is no `/` separator or either half is empty.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (owner, name) = self.0.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some((owner, name))
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        RepoName(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        RepoName(s.to_string())
    }
}

/// A GitHub user login.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Login(pub String);

impl Login {
    pub fn new(s: impl Into<String>) -> Self {
        Login(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Login {
    fn from(s: String) -> Self {
        Login(s)
    }
}

impl From<&str> for Login {
    fn from(s: &str) -> Self {
        Login(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod repo_name {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serializes_as_plain_string(
                owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
                name in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
            ) {
                let full = format!("{}/{}", owner, name);
                let repo = RepoName::new(&full);
                let json = serde_json::to_string(&repo).unwrap();
                prop_assert_eq!(json, format!("\"{}\"", full));
            }

            #[test]
            fn split_recovers_owner_and_name(
                owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
                name in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
            ) {
                let repo = RepoName::new(format!("{}/{}", owner, name));
                prop_assert_eq!(repo.split(), Some((owner.as_str(), name.as_str())));
            }
        }

        #[test]
        fn split_rejects_malformed_names() {
            assert_eq!(RepoName::from("no-slash").split(), None);
            assert_eq!(RepoName::from("/name").split(), None);
            assert_eq!(RepoName::from("owner/").split(), None);
        }

        #[test]
        fn usable_as_json_map_key() {
            let mut map = std::collections::BTreeMap::new();
            map.insert(RepoName::from("foo/bar"), 1);
            let json = serde_json::to_string(&map).unwrap();
            assert_eq!(json, r#"{"foo/bar":1}"#);
        }
    }

    mod login {
        use super::*;

        #[test]
        fn display_is_raw_login() {
            assert_eq!(Login::from("octocat").to_string(), "octocat");
        }

        #[test]
        fn ordering_matches_underlying_string() {
            assert!(Login::from("alice") < Login::from("bob"));
        }
    }
}
