//! Bounded-memory ingestion and consumption of user records in SQLite.
//!
//! Records are bulk-loaded once per identity, then read back as a row
//! cursor, as offset-paginated batches, or reduced to an average without
//! materializing the table.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod source;
pub mod stream;

pub use aggregate::{average, try_average, Average, RunningMean};
pub use config::{ConfigError, LogConfig, PipelineConfig, RowpipeConfig};
pub use db::{BootstrapOutcome, DbError, HandleCounts, SchemaError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::user::{NewUser, UserId, UserRecord};
pub use repo::{ErrorKind, LoadFailure, RepoError, RepoResult};
pub use service::loader::LoadReport;
pub use service::user_pipeline::UserPipeline;
pub use source::{CsvUserSource, SourceError, SourceResult};
pub use stream::{AgeStream, BatchStream, OlderThan, RowStream, UserStream};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
