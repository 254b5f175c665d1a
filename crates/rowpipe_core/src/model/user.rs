//! User record domain model.
//!
//! # Responsibility
//! - Define the canonical row shape stored in `user_data`.
//! - Define the pre-identity shape read from external sources.
//!
//! # Invariants
//! - `user_id` is assigned before first persistence and never reused for
//!   another logical record.
//! - `age` is a non-negative integer. `name` and `email` are stored as
//!   given, empty strings included.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one user row.
pub type UserId = Uuid;

/// One persisted row of `user_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub age: u32,
}

/// One record as read from an external source, before identity assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Present only when the source carries its own identity.
    ///
    /// Reloading such a source is idempotent: rows whose id already exists
    /// are skipped by the loader.
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub age: u32,
}

impl NewUser {
    /// Creates a record without external identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: u32) -> Self {
        Self {
            user_id: None,
            name: name.into(),
            email: email.into(),
            age,
        }
    }

    /// Creates a record that keeps a caller-provided identity.
    pub fn with_id(
        user_id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        age: u32,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::new(name, email, age)
        }
    }

    /// Resolves the final row, generating a fresh v4 id when none is set.
    pub fn into_record(self) -> UserRecord {
        UserRecord {
            user_id: self.user_id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            email: self.email,
            age: self.age,
        }
    }
}
