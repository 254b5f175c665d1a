//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open SQLite connections for one pipeline operation or stream.
//! - Apply connection settings from configuration.
//! - Register every open connection with the caller's [`ResourceTracker`].
//!
//! # Invariants
//! - `OpenMode::ExistingOnly` never creates a database file.
//! - A returned connection has already read the database header, so
//!   unreadable or non-SQLite files fail here instead of mid-stream.

use super::{DbError, DbResult, HandleGuard, ResourceTracker};
use crate::config::PipelineConfig;
use log::{debug, error};
use rusqlite::{Connection, OpenFlags};
use std::ops::{Deref, DerefMut};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    CreateIfMissing,
    ExistingOnly,
}

impl OpenMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            Self::CreateIfMissing => base | OpenFlags::SQLITE_OPEN_CREATE,
            Self::ExistingOnly => base,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::CreateIfMissing => "create",
            Self::ExistingOnly => "existing",
        }
    }
}

/// Connection counted in a [`ResourceTracker`] for as long as it lives.
#[derive(Debug)]
pub struct TrackedConnection {
    // Field order matters: the connection closes before the guard releases.
    conn: Connection,
    _guard: HandleGuard,
}

impl Deref for TrackedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for TrackedConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Opens the configured database file.
///
/// # Errors
/// - `DbError::Connectivity` when the file cannot be opened or read.
/// - `DbError::Sqlite` when connection settings cannot be applied.
pub fn open_db(
    config: &PipelineConfig,
    mode: OpenMode,
    tracker: &ResourceTracker,
) -> DbResult<TrackedConnection> {
    let started_at = Instant::now();
    let path = config.database.as_path();

    let conn = Connection::open_with_flags(path, mode.flags())
        .and_then(|conn| probe_header(&conn).map(|()| conn))
        .map_err(|source| {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode.label(),
                started_at.elapsed().as_millis(),
                source
            );
            DbError::Connectivity {
                path: path.to_path_buf(),
                source,
            }
        })?;

    conn.busy_timeout(config.busy_timeout())?;

    debug!(
        "event=db_open module=db status=ok mode={} duration_ms={}",
        mode.label(),
        started_at.elapsed().as_millis()
    );

    Ok(TrackedConnection {
        conn,
        _guard: tracker.acquire_connection(),
    })
}

fn probe_header(conn: &Connection) -> rusqlite::Result<()> {
    conn.query_row("PRAGMA schema_version;", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}
