//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Insert rows with skip-on-duplicate-id semantics.
//! - Serve bounded-range (`LIMIT`/`OFFSET`) and count queries.
//! - Decode `user_data` rows into [`UserRecord`].
//!
//! # Invariants
//! - Only a `user_id` collision is skipped; any other constraint violation
//!   is an error.
//! - Pages carry no `ORDER BY`; ordering is the backend default.

use crate::db::DbResult;
use crate::model::user::UserRecord;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub(crate) const USER_SELECT_SQL: &str = "SELECT
    user_id,
    name,
    email,
    age
FROM user_data";

pub(crate) const AGE_SELECT_SQL: &str = "SELECT age FROM user_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same `user_id` already existed; nothing was written.
    SkippedDuplicate,
}

/// Repository interface over `user_data`.
pub trait UserRepository {
    fn insert_user(&self, user: &UserRecord) -> DbResult<InsertOutcome>;
    /// Returns at most `limit` rows starting `offset` rows into the table.
    fn fetch_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<UserRecord>>;
    fn count_users(&self) -> RepoResult<u64>;
}

/// SQLite-backed user repository.
///
/// Accepts a plain connection or a transaction (via deref).
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &UserRecord) -> DbResult<InsertOutcome> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO user_data (user_id, name, email, age)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO NOTHING;",
        )?;
        let changed = stmt.execute(params![
            user.user_id.to_string(),
            user.name.as_str(),
            user.email.as_str(),
            i64::from(user.age),
        ])?;

        Ok(if changed == 0 {
            InsertOutcome::SkippedDuplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    fn fetch_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{USER_SELECT_SQL} LIMIT ?1 OFFSET ?2;"))?;
        let mut rows = stmt.query(params![limit, offset])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn count_users(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM user_data;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

pub(crate) fn parse_user_row(row: &Row<'_>) -> RepoResult<UserRecord> {
    let id_text: String = row.get("user_id")?;
    let user_id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in user_data.user_id"))
    })?;

    Ok(UserRecord {
        user_id,
        name: row.get("name")?,
        email: row.get("email")?,
        age: parse_age_value(row.get("age")?)?,
    })
}

pub(crate) fn parse_age_value(raw: i64) -> RepoResult<u32> {
    u32::try_from(raw)
        .map_err(|_| RepoError::InvalidData(format!("invalid age `{raw}` in user_data.age")))
}
