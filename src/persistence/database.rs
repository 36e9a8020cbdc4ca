//! On-disk format of the stargazer database.
//!
//! # File Format
//!
//! One pretty-printed JSON document holding every repository's stargazers:
//!
//! ```text
//! {
//!   "owner/repo": {
//!     "octocat": {
//!       "starred_at": "2024-11-19T21:30:00Z"
//!     }
//!   }
//! }
//! ```
//!
//! Keys are kept in sorted order so successive versions of the file diff
//! cleanly. The whole document is rewritten on every change (see
//! [`super::atomic`]).

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;

use super::atomic::write_atomic;
use crate::types::{Login, RepoName};

/// Name of the database file inside the configured directory.
pub const DATABASE_FILENAME: &str = "stargazers.json";

/// Errors that can occur while loading or saving the database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid JSON (truncated, corrupted).
    #[error("malformed database: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The file is valid JSON but doesn't have the expected shape.
    ///
    /// Typically written by an older, incompatible version. Recoverable by
    /// discarding the file: the next scan repopulates it.
    #[error("incompatible database schema: {0}")]
    Schema(#[source] serde_json::Error),

    /// Serialization failed while saving.
    #[error("JSON error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DatabaseError {
    /// Returns true if discarding the file and starting over is a valid recovery.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, DatabaseError::Schema(_))
    }

    fn from_decode(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => DatabaseError::Schema(err),
            Category::Io => DatabaseError::Io(err.into()),
            Category::Syntax | Category::Eof => DatabaseError::Malformed(err),
        }
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// What we remember about one star.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarRecord {
    pub starred_at: DateTime<Utc>,
}

/// The stargazers of one repository, keyed by login.
pub type RepoStars = BTreeMap<Login, StarRecord>;

/// The complete database: repository → login → star.
pub type StarDatabase = BTreeMap<RepoName, RepoStars>;

/// Saves the database atomically.
pub fn save_database(path: &Path, database: &StarDatabase) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(database).map_err(DatabaseError::Encode)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Loads the database from disk.
///
/// # Errors
///
/// Returns an error if the file can't be read, isn't valid JSON, or doesn't
/// match the expected shape ([`DatabaseError::Schema`]).
pub fn load_database(path: &Path) -> Result<StarDatabase> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(DatabaseError::from_decode)
}

/// Loads the database, treating a missing file as an empty database.
///
/// Other errors (malformed JSON, schema mismatch) are propagated.
pub fn try_load_database(path: &Path) -> Result<StarDatabase> {
    match load_database(path) {
        Ok(database) => Ok(database),
        Err(DatabaseError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            Ok(StarDatabase::new())
        }
        Err(e) => Err(e),
    }
}
