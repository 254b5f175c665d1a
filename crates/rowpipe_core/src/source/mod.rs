//! External record sources feeding the bulk loader.
//!
//! # Responsibility
//! - Turn external tabular input into a lazy sequence of [`NewUser`] values.
//!
//! # Invariants
//! - Sources never touch the store; identity assignment is the loader's job.
//!
//! [`NewUser`]: crate::model::user::NewUser

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod csv_source;

pub use csv_source::CsvUserSource;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug)]
pub enum SourceError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv(csv::Error),
    MissingHeader(&'static str),
    InvalidField {
        line: u64,
        field: &'static str,
        message: String,
    },
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read source `{}`: {source}", path.display())
            }
            Self::Csv(err) => write!(f, "malformed csv: {err}"),
            Self::MissingHeader(column) => write!(f, "csv header has no `{column}` column"),
            Self::InvalidField {
                line,
                field,
                message,
            } => write!(f, "line {line}: invalid `{field}`: {message}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
            Self::MissingHeader(_) => None,
            Self::InvalidField { .. } => None,
        }
    }
}

impl From<csv::Error> for SourceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
