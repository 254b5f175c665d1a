//! Public entry points of the ingestion and consumption pipeline.
//!
//! # Responsibility
//! - Own the explicit configuration and handle tracker for one store.
//! - Open one connection per operation or stream and hand it to the layer
//!   that owns its lifecycle.
//!
//! # Invariants
//! - No connection outlives the operation or stream it was opened for.
//! - Parameter validation happens before any connection is opened.
//! - Read operations expect `bootstrap()` to have run; a missing table is a
//!   storage error.

use crate::aggregate::{try_average, Average};
use crate::config::PipelineConfig;
use crate::db::{
    bootstrap_schema, open_db, BootstrapOutcome, HandleCounts, OpenMode, ResourceTracker,
    TrackedConnection,
};
use crate::model::user::{NewUser, UserRecord};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{LoadFailure, RepoError, RepoResult};
use crate::service::loader::{load_users, LoadReport};
use crate::source::{CsvUserSource, SourceResult};
use crate::stream::batches::validate_batch_size;
use crate::stream::rows::{with_age_stream, with_user_stream};
use crate::stream::{AgeStream, BatchStream, OlderThan, UserStream};
use std::path::Path;

/// Pipeline over one SQLite store.
#[derive(Debug, Clone)]
pub struct UserPipeline {
    config: PipelineConfig,
    tracker: ResourceTracker,
}

impl UserPipeline {
    /// # Errors
    /// - `RepoError::Configuration` when the config is invalid.
    pub fn new(config: PipelineConfig) -> RepoResult<Self> {
        config
            .validate()
            .map_err(|err| RepoError::Configuration(err.to_string()))?;
        Ok(Self {
            config,
            tracker: ResourceTracker::new(),
        })
    }

    /// Connections and cursors currently held by this pipeline's streams
    /// and operations.
    pub fn open_handles(&self) -> HandleCounts {
        self.tracker.counts()
    }

    /// Creates the database file, table and index when absent.
    ///
    /// Idempotent: later calls return `AlreadyPresent` and change nothing.
    pub fn bootstrap(&self) -> RepoResult<BootstrapOutcome> {
        let mut conn = open_db(&self.config, OpenMode::CreateIfMissing, &self.tracker)?;
        Ok(bootstrap_schema(&mut conn)?)
    }

    /// Loads all records of `source` in one transaction.
    ///
    /// See [`load_users`] for the atomicity and duplicate-skip contract.
    pub fn load<I>(&self, source: I) -> RepoResult<LoadReport>
    where
        I: IntoIterator<Item = SourceResult<NewUser>>,
    {
        let mut conn = self.connect()?;
        load_users(&mut conn, source)
    }

    /// Loads a header-described CSV file.
    ///
    /// A file that cannot be opened or lacks a required header fails with
    /// `RepoError::Load { record: 0, .. }` before the store is touched.
    pub fn load_csv_file(&self, path: impl AsRef<Path>) -> RepoResult<LoadReport> {
        let source = CsvUserSource::open(path).map_err(|err| RepoError::Load {
            record: 0,
            cause: LoadFailure::Source(err),
        })?;
        self.load(source)
    }

    /// Streams every row to `consume` through one connection and cursor.
    ///
    /// Both are released when `consume` returns, whether or not it drained
    /// the stream, and also if it panics.
    pub fn stream_rows<R, F>(&self, consume: F) -> RepoResult<R>
    where
        F: FnOnce(&mut UserStream<'_>) -> R,
    {
        let conn = self.connect()?;
        with_user_stream(&conn, &self.tracker, consume)
    }

    /// Same contract as [`Self::stream_rows`], yielding only `age`.
    pub fn stream_ages<R, F>(&self, consume: F) -> RepoResult<R>
    where
        F: FnOnce(&mut AgeStream<'_>) -> R,
    {
        let conn = self.connect()?;
        with_age_stream(&conn, &self.tracker, consume)
    }

    /// Opens a batch stream of `batch_size` rows per window.
    ///
    /// # Errors
    /// - `RepoError::Configuration` for `batch_size <= 0`; no connection is
    ///   opened in that case.
    pub fn stream_batches(&self, batch_size: i64) -> RepoResult<BatchStream> {
        let batch_size = validate_batch_size(batch_size)?;
        Ok(BatchStream::new(self.connect()?, batch_size))
    }

    /// Records with `age > min_age`, read through a batch stream.
    pub fn process_batches(&self, batch_size: i64, min_age: u32) -> RepoResult<OlderThan> {
        Ok(OlderThan::new(self.stream_batches(batch_size)?, min_age))
    }

    /// One bounded-range fetch.
    pub fn fetch_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<UserRecord>> {
        let limit = validate_batch_size(limit)?;
        if offset < 0 {
            return Err(RepoError::Configuration(format!(
                "offset must not be negative, got {offset}"
            )));
        }
        let conn = self.connect()?;
        SqliteUserRepository::new(&conn).fetch_page(limit, offset)
    }

    pub fn count_rows(&self) -> RepoResult<u64> {
        let conn = self.connect()?;
        SqliteUserRepository::new(&conn).count_users()
    }

    /// Mean age over a streamed `SELECT age`, in constant memory.
    pub fn average_age(&self) -> RepoResult<Average> {
        self.stream_ages(|ages| try_average(ages))?
    }

    fn connect(&self) -> RepoResult<TrackedConnection> {
        Ok(open_db(&self.config, OpenMode::ExistingOnly, &self.tracker)?)
    }
}
