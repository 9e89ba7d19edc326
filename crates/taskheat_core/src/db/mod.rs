//! SQLite bootstrap and schema migrations for task snapshot files.
//!
//! # Responsibility
//! - Open and configure SQLite connections for snapshot reads and writes.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Snapshot rows are never read from a file whose schema does not match.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_read_only};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// File has no snapshot schema (`user_version = 0`).
    MissingSchema,
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Older schema opened read-only, where it cannot be migrated.
    OutdatedSchema {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingSchema => write!(f, "file does not contain a task snapshot schema"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "snapshot schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::OutdatedSchema {
                db_version,
                latest_supported,
            } => write!(
                f,
                "snapshot schema version {db_version} is older than current {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
