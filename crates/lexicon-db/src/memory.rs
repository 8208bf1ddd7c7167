//! In-process question store.
//!
//! [`MemoryStore`] behaves like the `PostgreSQL` schema: serial ids, a
//! foreign-key check on label rows, cascading deletes, and transactions
//! that stage their writes on a copy of the tables and publish it on
//! commit. An open transaction holds the table lock until it ends, so
//! transactions are fully serialized.
//!
//! It backs the API tests and local runs without a database. One-shot
//! [`FailPoint`]s make the rollback paths reachable on demand.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lexicon_types::{Labels, QuestionId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::aggregate::QuestionRow;
use crate::error::DbError;
use crate::store::{QuestionStore, StoreTransaction};

/// An operation that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The next label batch insert fails.
    LabelInsert,
    /// The next commit fails (the transaction's writes are discarded).
    Commit,
    /// The next rollback fails.
    Rollback,
    /// The next join read fails.
    Fetch,
}

#[derive(Debug, Default)]
struct FailPoints {
    label_insert: AtomicBool,
    commit: AtomicBool,
    rollback: AtomicBool,
    fetch: AtomicBool,
}

impl FailPoints {
    const fn flag(&self, point: FailPoint) -> &AtomicBool {
        match point {
            FailPoint::LabelInsert => &self.label_insert,
            FailPoint::Commit => &self.commit,
            FailPoint::Rollback => &self.rollback,
            FailPoint::Fetch => &self.fetch,
        }
    }

    fn arm(&self, point: FailPoint) {
        self.flag(point).store(true, Ordering::SeqCst);
    }

    /// Consume the fail point, returning the injected error if it was armed.
    fn trip(&self, point: FailPoint) -> Result<(), DbError> {
        if self.flag(point).swap(false, Ordering::SeqCst) {
            tracing::debug!(?point, "Tripped memory store fail point");
            return Err(DbError::Memory(format!("injected {point:?} failure")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LabelRecord {
    language: String,
    value: String,
    question_id: i32,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    last_question_id: i32,
    questions: BTreeMap<i32, String>,
    /// Label rows in insertion order, which stands in for the serial id.
    labels: Vec<LabelRecord>,
}

impl Tables {
    fn next_question_id(&mut self) -> Result<i32, DbError> {
        self.last_question_id = self
            .last_question_id
            .checked_add(1)
            .ok_or_else(|| DbError::Memory(String::from("question id sequence exhausted")))?;
        Ok(self.last_question_id)
    }

    fn rows(&self, filter: Option<QuestionId>) -> Vec<QuestionRow> {
        let mut rows = Vec::new();
        for (&id, name) in &self.questions {
            if filter.is_some_and(|wanted| wanted.into_inner() != id) {
                continue;
            }
            let before = rows.len();
            rows.extend(
                self.labels
                    .iter()
                    .filter(|label| label.question_id == id)
                    .map(|label| QuestionRow::labelled(id, name, &label.language, &label.value)),
            );
            if rows.len() == before {
                rows.push(QuestionRow::bare(id, name));
            }
        }
        rows
    }

    fn remove_labels_of(&mut self, question_id: i32) -> u64 {
        let before = self.labels.len();
        self.labels.retain(|label| label.question_id != question_id);
        u64::try_from(before.saturating_sub(self.labels.len())).unwrap_or(u64::MAX)
    }
}

/// Question store held entirely in process memory.
///
/// Clones share the same tables and fail points.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<FailPoints>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation at `point` fail.
    pub fn fail_next(&self, point: FailPoint) {
        self.faults.arm(point);
    }

    /// Number of question rows currently committed.
    pub async fn question_count(&self) -> usize {
        self.tables.lock().await.questions.len()
    }

    /// Number of label rows currently committed, across all questions.
    pub async fn label_count(&self) -> usize {
        self.tables.lock().await.labels.len()
    }
}

impl QuestionStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, DbError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction {
            guard,
            staged,
            faults: Arc::clone(&self.faults),
        })
    }

    async fn fetch_rows(&self, id: Option<QuestionId>) -> Result<Vec<QuestionRow>, DbError> {
        self.faults.trip(FailPoint::Fetch)?;
        Ok(self.tables.lock().await.rows(id))
    }

    async fn delete_question(&self, id: QuestionId) -> Result<u64, DbError> {
        let mut tables = self.tables.lock().await;
        if tables.questions.remove(&id.into_inner()).is_none() {
            return Ok(0);
        }
        tables.remove_labels_of(id.into_inner());
        Ok(1)
    }
}

/// An open [`MemoryStore`] transaction.
///
/// Holds the table lock; writes land on a private copy that replaces the
/// shared tables on commit.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    faults: Arc<FailPoints>,
}

impl StoreTransaction for MemoryTransaction {
    async fn insert_question(&mut self, name: &str) -> Result<QuestionId, DbError> {
        let id = self.staged.next_question_id()?;
        self.staged.questions.insert(id, name.to_owned());
        Ok(QuestionId(id))
    }

    async fn update_question_name(&mut self, id: QuestionId, name: &str) -> Result<u64, DbError> {
        match self.staged.questions.get_mut(&id.into_inner()) {
            Some(existing) => {
                name.clone_into(existing);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_labels(&mut self, id: QuestionId) -> Result<u64, DbError> {
        Ok(self.staged.remove_labels_of(id.into_inner()))
    }

    async fn insert_labels(&mut self, id: QuestionId, labels: &Labels) -> Result<(), DbError> {
        self.faults.trip(FailPoint::LabelInsert)?;
        if !self.staged.questions.contains_key(&id.into_inner()) {
            return Err(DbError::Memory(format!(
                "foreign key violation: question {id} does not exist"
            )));
        }
        for (language, value) in labels {
            self.staged.labels.push(LabelRecord {
                language: language.clone(),
                value: value.clone(),
                question_id: id.into_inner(),
            });
        }
        Ok(())
    }

    async fn commit(mut self) -> Result<(), DbError> {
        self.faults.trip(FailPoint::Commit)?;
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DbError> {
        self.faults.trip(FailPoint::Rollback)
    }
}
