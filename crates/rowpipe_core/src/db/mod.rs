//! SQLite storage access and schema bootstrap.
//!
//! # Responsibility
//! - Open tracked SQLite connections from a [`crate::config::PipelineConfig`].
//! - Create the `user_data` schema idempotently.
//!
//! # Invariants
//! - Only bootstrap may create the database file.
//! - Every open connection and cursor is visible in [`ResourceTracker`]
//!   counts until it is dropped.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod bootstrap;
mod handles;
mod open;

pub use bootstrap::{bootstrap_schema, BootstrapOutcome, SCHEMA_VERSION, USER_DATA_TABLE};
pub use handles::{HandleCounts, HandleGuard, ResourceTracker};
pub use open::{open_db, OpenMode, TrackedConnection};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Database could not be opened or read: missing file, permissions, or
    /// not a SQLite database.
    Connectivity {
        path: PathBuf,
        source: rusqlite::Error,
    },
    Schema(SchemaError),
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connectivity { path, source } => {
                write!(f, "cannot open database `{}`: {source}", path.display())
            }
            Self::Schema(err) => write!(f, "{err}"),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connectivity { source, .. } => Some(source),
            Self::Schema(err) => Some(err),
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<SchemaError> for DbError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

/// Existing schema cannot be used by this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    UnsupportedVersion {
        db_version: u32,
        latest_supported: u32,
    },
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    MissingPrimaryKey {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MissingColumn { table, column } => {
                write!(f, "existing table `{table}` has no column `{column}`")
            }
            Self::MissingPrimaryKey { table, column } => {
                write!(f, "existing table `{table}` is not keyed by `{column}`")
            }
        }
    }
}

impl Error for SchemaError {}
