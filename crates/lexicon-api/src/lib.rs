//! HTTP API for the Lexicon questions service.
//!
//! This crate provides an Axum HTTP server that exposes create, read,
//! update and delete of questions and their per-language labels under
//! `/questions`, plus a version endpoint at `/`.
//!
//! # Architecture
//!
//! Handlers are generic over the [`QuestionStore`](lexicon_db::QuestionStore)
//! backing the shared [`AppState`], so the same router serves `PostgreSQL`
//! in production and the in-memory store in tests and local runs.
//! Data-layer errors become JSON error bodies through [`ApiError`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
