//! Domain model for user rows.
//!
//! # Responsibility
//! - Define the record shapes shared by loader, streams and aggregation.
//!
//! # Invariants
//! - Every persisted row is identified by a stable `UserId`.

pub mod user;
