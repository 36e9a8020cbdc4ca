//! Persistence layer for the stargazer database.
//!
//! # File Layout
//!
//! ```text
//! <directory>/
//!   stargazers.json       # the whole database, pretty-printed JSON
//!   stargazers.json.tmp   # only exists while a write is in flight
//! ```
//!
//! # Durability
//!
//! There is no write-ahead log. The store mutates its in-memory map and then
//! rewrites the whole file. A crash between the two loses at most the latest
//! delta; the next full scan reconciles it again.

pub mod atomic;
pub mod database;

pub use atomic::write_atomic;
pub use database::{
    DATABASE_FILENAME, DatabaseError, RepoStars, StarDatabase, StarRecord, load_database,
    save_database, try_load_database,
};
