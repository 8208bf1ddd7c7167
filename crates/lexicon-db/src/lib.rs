//! Data layer for the Lexicon questions service.
//!
//! Questions live in `PostgreSQL` as one `questions` row plus one `labels`
//! row per language. This crate keeps those rows consistent: every write
//! that touches more than one row runs in a single transaction, and the
//! join read is folded back into whole questions.
//!
//! # Architecture
//!
//! ```text
//! HTTP handler
//!     |
//!     +-- QuestionsDao ------------> Deferred<T> (returned immediately)
//!             |
//!             +-- QuestionStore / StoreTransaction
//!             |       |-- PgQuestionStore  (PostgreSQL via PostgresPool)
//!             |       +-- MemoryStore      (in process)
//!             |
//!             +-- aggregate()  (join rows -> questions)
//! ```
//!
//! # Modules
//!
//! - [`deferred`] -- Single-slot success/error result handles
//! - [`aggregate`] -- Folding join rows into questions
//! - [`store`] -- The store traits the orchestrator is written against
//! - [`dao`] -- The question workflows and rollback policy
//! - [`postgres`] -- `PostgreSQL` connection pool, configuration, schema
//! - [`question_store`] -- `PostgreSQL` store implementation
//! - [`memory`] -- In-process store implementation
//! - [`error`] -- Shared error types

pub mod aggregate;
pub mod dao;
pub mod deferred;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod question_store;
pub mod store;

// Re-export primary types for convenience.
pub use aggregate::{QuestionRow, aggregate, aggregate_one};
pub use dao::QuestionsDao;
pub use deferred::Deferred;
pub use error::DbError;
pub use memory::{FailPoint, MemoryStore, MemoryTransaction};
pub use postgres::{PostgresConfig, PostgresPool, SCHEMA_SQL};
pub use question_store::{PgQuestionStore, PgStoreTransaction};
pub use store::{QuestionStore, StoreTransaction};
