//! Lazy read paths over `user_data`.
//!
//! # Responsibility
//! - Row-at-a-time cursor streams (`rows`).
//! - Fixed-size offset-paginated batch streams (`batches`).
//!
//! # Invariants
//! - No read path materializes the full table.
//! - Connections and cursors are released deterministically on every exit
//!   path; nothing waits for a later collection pass.

pub mod batches;
pub mod rows;

pub use batches::{BatchStream, OlderThan};
pub use rows::{AgeStream, RowStream, UserStream};
