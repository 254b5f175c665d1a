//! Use-case services over the user store.
//!
//! # Responsibility
//! - Orchestrate db, repo, source and stream layers into pipeline operations.
//! - Keep CLI callers decoupled from storage details.

pub mod loader;
pub mod user_pipeline;
