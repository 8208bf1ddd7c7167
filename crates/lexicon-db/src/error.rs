//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors and the logical failures of the question workflows.

use lexicon_types::QuestionId;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// An in-memory store operation failed.
    #[error("memory store error: {0}")]
    Memory(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No question row exists for the id.
    #[error("question {0} not found")]
    NotFound(QuestionId),

    /// `create` was handed a question that already has an id.
    #[error("question already persisted with id {0}")]
    AlreadyPersisted(QuestionId),

    /// `update` was handed a question without an id.
    #[error("question has no id")]
    MissingId,

    /// The producer of a deferred result went away without completing it.
    #[error("operation ended without delivering a result")]
    Abandoned,

    /// A write failed and rolling the transaction back failed as well.
    #[error("{cause} (rollback also failed: {rollback})")]
    RollbackFailed {
        /// The error that triggered the rollback.
        cause: Box<DbError>,
        /// The error returned by the rollback itself.
        rollback: Box<DbError>,
    },
}

impl DbError {
    /// Whether this error means the addressed question does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
