//! Shared type definitions for the Lexicon questions service.
//!
//! This crate is the single source of truth for the question entity used by
//! the data layer and the HTTP API.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrapper for question identifiers
//! - [`question`] -- The question entity and its label map

pub mod ids;
pub mod question;

// Re-export all public types at crate root for convenience.
pub use ids::{ParseIdError, QuestionId};
pub use question::{Labels, Question, labels};
