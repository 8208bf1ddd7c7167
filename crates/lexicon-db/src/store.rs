//! The query surface the question workflows need from a relational store.
//!
//! [`QuestionStore`] covers the pool-level operations that run on their own
//! (the join read and the cascading delete). Every multi-row write goes
//! through a [`StoreTransaction`] obtained from [`QuestionStore::begin`],
//! which is either committed or rolled back as a whole.
//!
//! Two implementations ship with this crate:
//!
//! - [`PgQuestionStore`](crate::question_store::PgQuestionStore) over `PostgreSQL`
//! - [`MemoryStore`](crate::memory::MemoryStore) held in process

use std::future::Future;

use lexicon_types::{Labels, QuestionId};

use crate::aggregate::QuestionRow;
use crate::error::DbError;

/// A relational store holding questions and their label rows.
///
/// Handles are cheap to clone and shared by every orchestrator; they are
/// never mutated after construction.
pub trait QuestionStore: Clone + Send + Sync + 'static {
    /// Transaction handle returned by [`QuestionStore::begin`].
    type Transaction: StoreTransaction;

    /// Open a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, DbError>> + Send;

    /// Run the `questions LEFT OUTER JOIN labels` query, optionally filtered
    /// to one question id.
    ///
    /// Rows are ordered by question id, then by label insertion order.
    fn fetch_rows(
        &self,
        id: Option<QuestionId>,
    ) -> impl Future<Output = Result<Vec<QuestionRow>, DbError>> + Send;

    /// Delete a question row. Its label rows go with it.
    ///
    /// Returns the number of question rows removed (0 or 1).
    fn delete_question(&self, id: QuestionId) -> impl Future<Output = Result<u64, DbError>> + Send;
}

/// An open transaction on a [`QuestionStore`].
///
/// Nothing written through the handle is visible to other callers until
/// [`StoreTransaction::commit`] succeeds. Dropping the handle without
/// committing discards the writes.
pub trait StoreTransaction: Send {
    /// Insert a question row and return the id the store generated.
    fn insert_question(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<QuestionId, DbError>> + Send;

    /// Rename a question. Returns the number of rows updated (0 or 1).
    fn update_question_name(
        &mut self,
        id: QuestionId,
        name: &str,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete every label row of a question. Returns the number removed.
    fn delete_labels(&mut self, id: QuestionId) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Insert one label row per entry of `labels`, all tagged with `id`, as
    /// a single batch.
    fn insert_labels(
        &mut self,
        id: QuestionId,
        labels: &Labels,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Make every write of this transaction visible.
    fn commit(self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Discard every write of this transaction.
    fn rollback(self) -> impl Future<Output = Result<(), DbError>> + Send;
}
