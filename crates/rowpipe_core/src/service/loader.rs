//! Atomic bulk load of external user records.
//!
//! # Responsibility
//! - Assign identity to each incoming record and insert it.
//! - Wrap one whole load in a single transaction.
//!
//! # Invariants
//! - Either every non-duplicate record of the call is committed, or none is.
//! - A `user_id` collision is counted and skipped, never an error.
//! - The source is consumed one record at a time.

use crate::model::user::NewUser;
use crate::repo::user_repo::{InsertOutcome, SqliteUserRepository, UserRepository};
use crate::repo::{LoadFailure, RepoError, RepoResult};
use crate::source::SourceResult;
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::time::Instant;

/// Counters for one completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Records pulled from the source.
    pub read: u64,
    pub inserted: u64,
    pub skipped_duplicates: u64,
}

/// Loads every record of `source` inside one immediate transaction.
///
/// # Errors
/// - `RepoError::Load` when a source record cannot be read or parsed, or an
///   insert fails for any reason other than a `user_id` collision. The
///   transaction is rolled back before returning, and the original cause
///   is kept even if SQLite already aborted the transaction itself.
/// - `RepoError::Db` when the transaction cannot begin or commit.
pub fn load_users<I>(conn: &mut Connection, source: I) -> RepoResult<LoadReport>
where
    I: IntoIterator<Item = SourceResult<NewUser>>,
{
    let started_at = Instant::now();
    info!("event=bulk_load module=loader status=start");

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let outcome = insert_all(&SqliteUserRepository::new(&tx), source);

    let report = match outcome {
        Ok(report) => report,
        Err(err) => {
            error!(
                "event=bulk_load module=loader status=error action=rollback duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            // Dropping rolls back, and is a no-op when SQLite already did.
            drop(tx);
            return Err(err);
        }
    };

    tx.commit()?;
    info!(
        "event=bulk_load module=loader status=ok read={} inserted={} skipped_duplicates={} duration_ms={}",
        report.read,
        report.inserted,
        report.skipped_duplicates,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

fn insert_all<R, I>(repo: &R, source: I) -> RepoResult<LoadReport>
where
    R: UserRepository,
    I: IntoIterator<Item = SourceResult<NewUser>>,
{
    let mut report = LoadReport::default();
    for item in source {
        report.read += 1;
        let record = report.read;
        let abort = |cause| RepoError::Load { record, cause };

        let user = item.map_err(|err| abort(LoadFailure::Source(err)))?;

        match repo
            .insert_user(&user.into_record())
            .map_err(|err| abort(LoadFailure::Store(err)))?
        {
            InsertOutcome::Inserted => report.inserted += 1,
            InsertOutcome::SkippedDuplicate => report.skipped_duplicates += 1,
        }
    }
    Ok(report)
}
