//! Single-pass cursor over the whole `user_data` table.
//!
//! # Responsibility
//! - Prepare one unbounded `SELECT` and hand its rows to a consumer lazily.
//! - Release statement and cursor when the consumer returns.
//!
//! # Invariants
//! - One cursor per call; it is never rewound or reopened.
//! - Cursor release happens on every exit path of the consumer: exhaustion,
//!   early return, error return, or panic unwinding.
//! - After yielding an error the stream yields `None`.

use crate::db::{HandleGuard, ResourceTracker};
use crate::model::user::UserRecord;
use crate::repo::user_repo::{parse_age_value, parse_user_row, AGE_SELECT_SQL, USER_SELECT_SQL};
use crate::repo::RepoResult;
use log::info;
use rusqlite::{Connection, Row, Rows};
use std::iter::FusedIterator;
use std::time::Instant;

type Decode<T> = fn(&Row<'_>) -> RepoResult<T>;

/// Lazy stream of decoded rows; lives only inside a consumer closure.
pub struct RowStream<'stmt, T> {
    rows: Rows<'stmt>,
    decode: Decode<T>,
    pulled: u64,
    finished: bool,
    _cursor: HandleGuard,
}

/// Full-record stream handed out by `UserPipeline::stream_rows`.
pub type UserStream<'stmt> = RowStream<'stmt, UserRecord>;

/// Age-only stream handed out by `UserPipeline::stream_ages`.
pub type AgeStream<'stmt> = RowStream<'stmt, u32>;

impl<T> RowStream<'_, T> {
    /// Rows yielded so far.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    /// Whether the cursor reached its end (or failed).
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<T> Iterator for RowStream<'_, T> {
    type Item = RepoResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let decoded = match self.rows.next() {
            Ok(Some(row)) => (self.decode)(row),
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(err) => Err(err.into()),
        };
        match decoded {
            Ok(value) => {
                self.pulled += 1;
                Some(Ok(value))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<T> FusedIterator for RowStream<'_, T> {}

pub(crate) fn with_user_stream<R, F>(
    conn: &Connection,
    tracker: &ResourceTracker,
    consume: F,
) -> RepoResult<R>
where
    F: FnOnce(&mut UserStream<'_>) -> R,
{
    with_row_stream(conn, tracker, "rows", USER_SELECT_SQL, parse_user_row, consume)
}

pub(crate) fn with_age_stream<R, F>(
    conn: &Connection,
    tracker: &ResourceTracker,
    consume: F,
) -> RepoResult<R>
where
    F: FnOnce(&mut AgeStream<'_>) -> R,
{
    with_row_stream(conn, tracker, "ages", AGE_SELECT_SQL, decode_age, consume)
}

fn with_row_stream<T, R, F>(
    conn: &Connection,
    tracker: &ResourceTracker,
    label: &str,
    sql: &str,
    decode: Decode<T>,
    consume: F,
) -> RepoResult<R>
where
    F: FnOnce(&mut RowStream<'_, T>) -> R,
{
    let started_at = Instant::now();
    let mut stmt = conn.prepare(sql)?;
    let mut stream = RowStream {
        rows: stmt.query([])?,
        decode,
        pulled: 0,
        finished: false,
        _cursor: tracker.acquire_cursor(),
    };
    info!("event=row_stream module=stream status=start stream={label}");

    let result = consume(&mut stream);

    info!(
        "event=row_stream module=stream status=ok stream={} rows={} exhausted={} duration_ms={}",
        label,
        stream.pulled,
        stream.finished,
        started_at.elapsed().as_millis()
    );
    Ok(result)
}

fn decode_age(row: &Row<'_>) -> RepoResult<u32> {
    parse_age_value(row.get(0)?)
}
