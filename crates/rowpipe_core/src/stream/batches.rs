//! Offset-paginated batch stream over `user_data`.
//!
//! # Responsibility
//! - Fetch successive `LIMIT batch_size OFFSET n * batch_size` windows over
//!   one connection held for the stream's lifetime.
//! - Release that connection on exhaustion, error, `close()` or drop.
//!
//! # Invariants
//! - The only end-of-stream signal is a fetch returning zero rows; the row
//!   count is never inspected.
//! - Windows are offset-based: inserts or deletes between fetches may cause
//!   rows to be skipped or repeated across batches.

use crate::db::TrackedConnection;
use crate::model::user::UserRecord;
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;
use std::iter::FusedIterator;

/// Rejects non-positive batch sizes.
pub(crate) fn validate_batch_size(batch_size: i64) -> RepoResult<i64> {
    if batch_size <= 0 {
        return Err(RepoError::Configuration(format!(
            "batch_size must be a positive integer, got {batch_size}"
        )));
    }
    Ok(batch_size)
}

/// Lazy sequence of row windows.
pub struct BatchStream {
    conn: Option<TrackedConnection>,
    batch_size: i64,
    offset: i64,
    batches: u64,
}

impl BatchStream {
    pub(crate) fn new(conn: TrackedConnection, batch_size: i64) -> Self {
        info!("event=batch_stream module=stream status=start batch_size={batch_size}");
        Self {
            conn: Some(conn),
            batch_size,
            offset: 0,
            batches: 0,
        }
    }

    /// Offset of the next window to fetch.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Whether the underlying connection is still held.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Releases the connection now; later pulls yield `None`.
    pub fn close(mut self) {
        self.release("closed");
    }

    fn release(&mut self, reason: &str) {
        if self.conn.take().is_some() {
            info!(
                "event=batch_stream module=stream status=ok reason={} batches={} offset={}",
                reason, self.batches, self.offset
            );
        }
    }
}

impl Iterator for BatchStream {
    type Item = RepoResult<Vec<UserRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        let conn = self.conn.as_ref()?;
        let page = SqliteUserRepository::new(conn).fetch_page(self.batch_size, self.offset);
        match page {
            Ok(batch) if batch.is_empty() => {
                self.release("exhausted");
                None
            }
            Ok(batch) => {
                self.offset = self.offset.saturating_add(self.batch_size);
                self.batches += 1;
                Some(Ok(batch))
            }
            Err(err) => {
                self.release("error");
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for BatchStream {}

impl Drop for BatchStream {
    fn drop(&mut self) {
        self.release("dropped");
    }
}

/// Records with `age > min_age`, pulled batch by batch.
///
/// Holds at most one batch in memory.
pub struct OlderThan {
    batches: BatchStream,
    current: std::vec::IntoIter<UserRecord>,
    min_age: u32,
}

impl OlderThan {
    pub(crate) fn new(batches: BatchStream, min_age: u32) -> Self {
        Self {
            batches,
            current: Vec::new().into_iter(),
            min_age,
        }
    }

    /// Releases the underlying batch stream early.
    pub fn close(self) {
        self.batches.close();
    }
}

impl Iterator for OlderThan {
    type Item = RepoResult<UserRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let min_age = self.min_age;
        loop {
            if let Some(user) = self.current.find(|user| user.age > min_age) {
                return Some(Ok(user));
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl FusedIterator for OlderThan {}
