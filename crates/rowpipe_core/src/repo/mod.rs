//! Repository layer over the `user_data` table.
//!
//! # Responsibility
//! - Keep SQL for inserts, bounded-range reads and full scans in one place.
//! - Define the error taxonomy surfaced by pipeline operations.
//!
//! # Invariants
//! - Primary-key collisions on insert are reported as outcomes, never as
//!   errors.
//! - Read paths reject invalid persisted rows instead of masking them.

pub mod user_repo;

use crate::db::{DbError, SchemaError};
use crate::source::SourceError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse classification of [`RepoError`] for callers deciding what to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store unreachable or unreadable.
    Connectivity,
    /// Existing schema incompatible with this build.
    Schema,
    /// Bulk load aborted and rolled back.
    Load,
    /// Invalid caller-supplied parameter; no resource was acquired.
    Configuration,
    /// Any other backend failure on an established connection.
    Storage,
    /// Persisted row cannot be decoded.
    InvalidData,
}

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Configuration(String),
    /// The load was rolled back. `record` is the 1-based position in the
    /// source of the record that failed.
    Load {
        record: u64,
        cause: LoadFailure,
    },
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(DbError::Connectivity { .. }) => ErrorKind::Connectivity,
            Self::Db(DbError::Schema(_)) => ErrorKind::Schema,
            Self::Db(DbError::Sqlite(_)) => ErrorKind::Storage,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Load { .. } => ErrorKind::Load,
            Self::InvalidData(_) => ErrorKind::InvalidData,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Configuration(message) => write!(f, "invalid configuration: {message}"),
            Self::Load { record, cause } => {
                write!(f, "load rolled back at record {record}: {cause}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Configuration(_) => None,
            Self::Load { cause, .. } => Some(cause),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Db(DbError::Schema(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Why a bulk load was aborted.
#[derive(Debug)]
pub enum LoadFailure {
    Source(SourceError),
    Store(DbError),
}

impl Display for LoadFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "source error: {err}"),
            Self::Store(err) => write!(f, "insert failed: {err}"),
        }
    }
}

impl Error for LoadFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}
