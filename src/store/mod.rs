//! The stargazer reconciliation store.
//!
//! The store owns the authoritative repo → login → star map and its on-disk
//! mirror. Callers never see the map itself: every mutation goes through a
//! method that returns only the records that actually changed, so each star
//! gained or lost surfaces exactly once no matter how many times (or from how
//! many places) it is observed.
//!
//! # Locking
//!
//! A single `RwLock` guards the map. Mutations hold the write lock for the
//! whole diff → mutate → persist sequence, including the disk write, so two
//! concurrent writers can never interleave such that one persists a stale
//! copy over the other's update. Reads take the shared lock.
//!
//! [`NotifyingStore`] delivers notifications after the lock is released, so
//! two concurrent mutations of one repository may notify in a different
//! order than they were applied.
//!
//! # Persist Failures
//!
//! A failed disk write does **not** roll back the in-memory change: the map
//! is already the new truth. The error carries the applied [`Changes`] so
//! the caller can still notify; the file catches up on the next successful
//! write.

mod notifying;

pub use notifying::NotifyingStore;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::persistence::{
    DATABASE_FILENAME, DatabaseError, RepoStars, StarDatabase, StarRecord, save_database,
    try_load_database,
};
use crate::types::{RepoName, Stargazer};

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be loaded at startup.
    #[error("failed to load database {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: DatabaseError,
    },

    /// The in-memory state was updated but could not be written to disk.
    #[error("failed to persist database: {source}")]
    Persist {
        /// The changes that were applied in memory.
        changes: Changes,
        #[source]
        source: DatabaseError,
    },
}

impl StoreError {
    /// Returns true if the error is a load failure that reinitializing fixes.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, StoreError::Load { source, .. } if source.is_schema_error())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The delta produced by a store mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    /// Stars that were not present before the operation.
    pub added: Vec<Stargazer>,
    /// Stars that were present before the operation and are now gone.
    pub removed: Vec<Stargazer>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Durable map of which users starred which repositories.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    repos: RwLock<StarDatabase>,
}

impl Store {
    /// Opens the store in `directory`, loading `stargazers.json` if it exists.
    ///
    /// A missing file yields an empty store. A file with an incompatible
    /// shape returns an error for which [`StoreError::is_schema_error`] is true.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let path = directory.as_ref().join(DATABASE_FILENAME);
        let repos = try_load_database(&path).map_err(|source| StoreError::Load {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), repos = repos.len(), "Loaded stargazer database");

        Ok(Store {
            path,
            repos: RwLock::new(repos),
        })
    }

    /// Opens the store, discarding the database file if it was written with
    /// an incompatible schema.
    ///
    /// Discarding is safe because a full scan repopulates the store. Any
    /// other load error is returned as-is.
    pub fn open_or_reinitialize(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        match Self::open(directory) {
            Err(e) if e.is_schema_error() => {
                warn!(error = %e, "Failed to load database, reinitializing");
                let path = directory.join(DATABASE_FILENAME);
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
                    Err(io_err) => {
                        return Err(StoreError::Load {
                            path,
                            source: io_err.into(),
                        });
                    }
                }
                Self::open(directory)
            }
            other => other,
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds stargazers to a repository.
    ///
    /// Returns the stargazers that were not yet known. Re-adding a known star
    /// refreshes its timestamp but is not reported. The file is rewritten
    /// once, and only if a record was added or its timestamp changed.
    pub async fn add(&self, repo: &RepoName, stargazers: &[Stargazer]) -> Result<Vec<Stargazer>> {
        if stargazers.is_empty() {
            return Ok(Vec::new());
        }

        let mut repos = self.repos.write().await;
        let stars = repos.entry(repo.clone()).or_default();

        let mut added = Vec::new();
        let mut refreshed = false;
        for star in stargazers {
            let record = StarRecord {
                starred_at: star.starred_at,
            };
            match stars.insert(star.login.clone(), record) {
                None => added.push(star.clone()),
                Some(previous) if previous != record => refreshed = true,
                Some(_) => {}
            }
        }

        if added.is_empty() && !refreshed {
            return Ok(added);
        }

        debug!(repo = %repo, added = added.len(), "Stargazers added");
        self.persist(&repos, || Changes {
            added: added.clone(),
            removed: Vec::new(),
        })?;
        Ok(added)
    }

    /// Removes stargazers from a repository.
    ///
    /// Returns the stargazers that were actually present. The file is
    /// rewritten once, and only if something was removed.
    pub async fn delete(
        &self,
        repo: &RepoName,
        stargazers: &[Stargazer],
    ) -> Result<Vec<Stargazer>> {
        let mut repos = self.repos.write().await;
        let Some(stars) = repos.get_mut(repo) else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        for star in stargazers {
            if stars.remove(&star.login).is_some() {
                removed.push(star.clone());
            }
        }

        if removed.is_empty() {
            return Ok(removed);
        }

        debug!(repo = %repo, removed = removed.len(), "Stargazers removed");
        self.persist(&repos, || Changes {
            added: Vec::new(),
            removed: removed.clone(),
        })?;
        Ok(removed)
    }

    /// Replaces the stored stargazers of a repository with exactly `stargazers`.
    ///
    /// Both sides of the diff are computed against the state at lock
    /// acquisition: `added` are fetched logins that weren't stored, `removed`
    /// are stored logins that weren't fetched. This is what lets a full poll
    /// detect stars withdrawn while nobody was listening.
    pub async fn set(&self, repo: &RepoName, stargazers: &[Stargazer]) -> Result<Changes> {
        let mut repos = self.repos.write().await;
        let previous = repos.get(repo);

        let mut fresh = RepoStars::new();
        let mut added = Vec::new();
        for star in stargazers {
            let record = StarRecord {
                starred_at: star.starred_at,
            };
            let was_stored = previous.is_some_and(|stars| stars.contains_key(&star.login));
            if fresh.insert(star.login.clone(), record).is_none() && !was_stored {
                added.push(star.clone());
            }
        }

        // Removed stars only exist in the map, so rebuild them from the
        // record plus whatever repository link the fetched side carried.
        let repo_url = stargazers.iter().find_map(|s| s.repo_url.clone());
        let removed: Vec<Stargazer> = previous
            .into_iter()
            .flatten()
            .filter(|(login, _)| !fresh.contains_key(*login))
            .map(|(login, record)| Stargazer {
                repo_url: repo_url.clone(),
                ..Stargazer::new(repo.clone(), login.clone(), record.starred_at)
            })
            .collect();

        if previous == Some(&fresh) {
            return Ok(Changes::default());
        }

        repos.insert(repo.clone(), fresh);
        let changes = Changes { added, removed };

        debug!(
            repo = %repo,
            added = changes.added.len(),
            removed = changes.removed.len(),
            "Stargazers reconciled"
        );
        self.persist(&repos, || changes.clone())?;
        Ok(changes)
    }

    /// Returns the number of repositories in the store.
    pub async fn len(&self) -> usize {
        self.repos.read().await.len()
    }

    /// Returns true if no repository has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.repos.read().await.is_empty()
    }

    /// Returns the number of stargazers recorded for a repository.
    pub async fn stargazer_count(&self, repo: &RepoName) -> usize {
        self.repos.read().await.get(repo).map_or(0, |stars| stars.len())
    }

    /// Returns a copy of the whole database.
    pub async fn snapshot(&self) -> StarDatabase {
        self.repos.read().await.clone()
    }

    fn persist(&self, repos: &StarDatabase, changes: impl FnOnce() -> Changes) -> Result<()> {
        save_database(&self.path, repos).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "Failed to persist database");
            StoreError::Persist {
                changes: changes(),
                source,
            }
        })
    }
}
