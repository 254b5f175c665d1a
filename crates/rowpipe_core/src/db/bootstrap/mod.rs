//! Idempotent creation of the `user_data` schema.
//!
//! # Responsibility
//! - Create table and index when absent; otherwise leave them untouched.
//! - Reject existing schemas this build cannot read.
//!
//! # Invariants
//! - Applied schema version is mirrored to `PRAGMA user_version`.
//! - Creation runs in one immediate transaction, so concurrent bootstraps
//!   serialize instead of interleaving.

use crate::db::{DbError, DbResult, SchemaError};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

pub const SCHEMA_VERSION: u32 = 1;
pub const USER_DATA_TABLE: &str = "user_data";

const USER_DATA_SQL: &str = include_str!("0001_user_data.sql");
const REQUIRED_COLUMNS: [&str; 4] = ["user_id", "name", "email", "age"];
const PRIMARY_KEY_COLUMN: &str = "user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The table did not exist and was created.
    Created,
    /// A compatible table already existed; nothing but missing index or
    /// version bookkeeping was touched.
    AlreadyPresent,
}

/// Ensures `user_data` and its primary-key index exist.
///
/// # Errors
/// - `SchemaError::UnsupportedVersion` when the database was written by a
///   newer schema.
/// - `SchemaError::MissingColumn` / `MissingPrimaryKey` when an existing
///   `user_data` table has an incompatible shape.
pub fn bootstrap_schema(conn: &mut Connection) -> DbResult<BootstrapOutcome> {
    let db_version = current_user_version(conn)?;
    if db_version > SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            db_version,
            latest_supported: SCHEMA_VERSION,
        }
        .into());
    }

    let table_existed = table_exists(conn, USER_DATA_TABLE)?;
    if table_existed {
        ensure_user_data_shape(conn)?;
    }

    let schema_changed = !(db_version == SCHEMA_VERSION && table_existed);
    if schema_changed {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(USER_DATA_SQL)?;
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        tx.commit()?;
    }

    let outcome = if table_existed {
        BootstrapOutcome::AlreadyPresent
    } else {
        BootstrapOutcome::Created
    };
    info!(
        "event=schema_bootstrap module=db status=ok outcome={:?} schema_changed={} schema_version={}",
        outcome, schema_changed, SCHEMA_VERSION
    );
    Ok(outcome)
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_user_data_shape(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({USER_DATA_TABLE});"))?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    let mut keyed_by_id = false;
    while let Some(row) = rows.next()? {
        let name: String = row.get("name")?;
        let pk_position: i64 = row.get("pk")?;
        if name == PRIMARY_KEY_COLUMN && pk_position > 0 {
            keyed_by_id = true;
        }
        present.push(name);
    }

    for column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(DbError::Schema(SchemaError::MissingColumn {
                table: USER_DATA_TABLE,
                column,
            }));
        }
    }
    if !keyed_by_id {
        return Err(DbError::Schema(SchemaError::MissingPrimaryKey {
            table: USER_DATA_TABLE,
            column: PRIMARY_KEY_COLUMN,
        }));
    }

    Ok(())
}
