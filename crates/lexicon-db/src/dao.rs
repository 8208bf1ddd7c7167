//! Question persistence orchestration.
//!
//! [`QuestionsDao`] is the entry point the HTTP layer talks to. Each
//! operation returns a [`Deferred`] right away and runs its store work as a
//! Tokio task. The writes follow one rule: a question row and its label
//! rows change together or not at all.
//!
//! ```text
//! create:  BEGIN -> INSERT question -> INSERT labels (one batch) -> COMMIT
//! update:  BEGIN -> UPDATE name -> DELETE labels -> INSERT labels -> COMMIT
//! remove:  DELETE question (labels cascade)
//! ```
//!
//! Any failure inside a transaction rolls it back before the error is
//! delivered. If the rollback fails too, both errors are delivered together
//! as [`DbError::RollbackFailed`].
//!
//! Writes to the same question are not serialized here. Two concurrent
//! updates of one id race at the store's isolation level; under read
//! committed their delete-then-insert label steps can interleave and the
//! final label set may mix rows from both. Callers that need strict
//! ordering per id must lock externally or run the store at serializable
//! isolation.

use lexicon_types::{Question, QuestionId};

use crate::aggregate::{aggregate, aggregate_one};
use crate::deferred::Deferred;
use crate::error::DbError;
use crate::store::{QuestionStore, StoreTransaction};

/// Create/read/update/delete for questions over a [`QuestionStore`].
#[derive(Debug, Clone)]
pub struct QuestionsDao<S> {
    store: S,
}

impl<S: QuestionStore> QuestionsDao<S> {
    /// Create an orchestrator over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Return the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Every question with its labels, ordered by id.
    pub fn all(&self) -> Deferred<Vec<Question>> {
        let store = self.store.clone();
        Deferred::spawn(async move {
            let rows = store.fetch_rows(None).await?;
            let questions = aggregate(rows);
            tracing::debug!(count = questions.len(), "Fetched questions");
            Ok(questions)
        })
    }

    /// The question with `id`, or `None` if there is none.
    pub fn read(&self, id: QuestionId) -> Deferred<Option<Question>> {
        let store = self.store.clone();
        Deferred::spawn(async move {
            let rows = store.fetch_rows(Some(id)).await?;
            Ok(aggregate_one(rows))
        })
    }

    /// Persist a new question and all of its labels.
    ///
    /// Delivers the question tagged with its new id. A question that
    /// already carries an id is refused with [`DbError::AlreadyPersisted`].
    pub fn create(&self, question: Question) -> Deferred<Question> {
        if let Some(id) = question.id {
            return Deferred::from_result(Err(DbError::AlreadyPersisted(id)));
        }
        let store = self.store.clone();
        Deferred::spawn(async move { create_question(&store, question).await })
    }

    /// Rename a question and replace its whole label set.
    ///
    /// Delivers the question exactly as passed in. Labels missing from
    /// `question.labels` are deleted. Fails with [`DbError::MissingId`] if
    /// the question has no id and with [`DbError::NotFound`] if no row has
    /// that id.
    pub fn update(&self, question: Question) -> Deferred<Question> {
        let Some(id) = question.id else {
            return Deferred::from_result(Err(DbError::MissingId));
        };
        let store = self.store.clone();
        Deferred::spawn(async move { update_question(&store, id, question).await })
    }

    /// Delete a question and its labels.
    ///
    /// Delivers the number of question rows removed. Removing an id that
    /// does not exist delivers 0.
    pub fn remove(&self, id: QuestionId) -> Deferred<u64> {
        let store = self.store.clone();
        Deferred::spawn(async move {
            let removed = store.delete_question(id).await?;
            tracing::debug!(question_id = %id, removed, "Removed question");
            Ok(removed)
        })
    }
}

async fn create_question<S: QuestionStore>(
    store: &S,
    question: Question,
) -> Result<Question, DbError> {
    let mut tx = store.begin().await?;

    let id = match insert_with_labels(&mut tx, &question).await {
        Ok(id) => id,
        Err(cause) => return Err(abort(tx, cause).await),
    };
    tx.commit().await?;

    tracing::debug!(
        question_id = %id,
        labels = question.labels.len(),
        "Created question"
    );
    Ok(question.with_id(id))
}

async fn insert_with_labels<T: StoreTransaction>(
    tx: &mut T,
    question: &Question,
) -> Result<QuestionId, DbError> {
    let id = tx.insert_question(&question.name).await?;
    tx.insert_labels(id, &question.labels).await?;
    Ok(id)
}

async fn update_question<S: QuestionStore>(
    store: &S,
    id: QuestionId,
    question: Question,
) -> Result<Question, DbError> {
    let mut tx = store.begin().await?;

    if let Err(cause) = replace_labels(&mut tx, id, &question).await {
        return Err(abort(tx, cause).await);
    }
    tx.commit().await?;

    tracing::debug!(
        question_id = %id,
        labels = question.labels.len(),
        "Updated question"
    );
    Ok(question)
}

async fn replace_labels<T: StoreTransaction>(
    tx: &mut T,
    id: QuestionId,
    question: &Question,
) -> Result<(), DbError> {
    if tx.update_question_name(id, &question.name).await? == 0 {
        return Err(DbError::NotFound(id));
    }
    tx.delete_labels(id).await?;
    tx.insert_labels(id, &question.labels).await
}

/// Roll `tx` back after `cause` and return the error to deliver.
async fn abort<T: StoreTransaction>(tx: T, cause: DbError) -> DbError {
    match tx.rollback().await {
        Ok(()) => {
            tracing::warn!(error = %cause, "Rolled back question write");
            cause
        }
        Err(rollback) => {
            tracing::error!(
                error = %cause,
                rollback_error = %rollback,
                "Rollback of question write failed"
            );
            DbError::RollbackFailed {
                cause: Box::new(cause),
                rollback: Box::new(rollback),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::{Arc, Mutex};

    use lexicon_types::{Labels, labels};

    use super::*;
    use crate::memory::{FailPoint, MemoryStore};

    fn dao() -> QuestionsDao<MemoryStore> {
        QuestionsDao::new(MemoryStore::new())
    }

    fn q1() -> Question {
        Question::new("Q1", labels([("en", "Hello"), ("fr", "Bonjour")]))
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let dao = dao();

        let created = dao.create(q1()).await.unwrap();
        assert_eq!(created, q1().with_id(QuestionId(1)));

        let read = dao.read(QuestionId(1)).await.unwrap();
        assert_eq!(read, Some(created));
    }

    #[tokio::test]
    async fn create_without_labels_reads_back_empty() {
        let dao = dao();
        let created = dao.create(Question::new("R", Labels::new())).await.unwrap();

        let read = dao.read(created.id.unwrap()).await.unwrap().unwrap();
        assert!(read.labels.is_empty());
        assert_eq!(read.name, "R");
    }

    #[tokio::test]
    async fn failed_label_insert_leaves_nothing_behind() {
        let dao = dao();
        dao.store().fail_next(FailPoint::LabelInsert);

        let err = dao.create(q1()).await.unwrap_err();
        assert!(matches!(err, DbError::Memory(_)));

        assert!(dao.all().await.unwrap().is_empty());
        assert_eq!(dao.store().question_count().await, 0);
        assert_eq!(dao.store().label_count().await, 0);
    }

    #[tokio::test]
    async fn failed_rollback_is_reported_with_cause() {
        let dao = dao();
        dao.store().fail_next(FailPoint::LabelInsert);
        dao.store().fail_next(FailPoint::Rollback);

        match dao.create(q1()).await.unwrap_err() {
            DbError::RollbackFailed { cause, rollback } => {
                assert!(cause.to_string().contains("LabelInsert"));
                assert!(rollback.to_string().contains("Rollback"));
            }
            other => panic!("expected RollbackFailed, got {other:?}"),
        }
        assert_eq!(dao.store().question_count().await, 0);
    }

    #[tokio::test]
    async fn failed_commit_surfaces_commit_error() {
        let dao = dao();
        dao.store().fail_next(FailPoint::Commit);

        let err = dao.create(q1()).await.unwrap_err();
        assert!(err.to_string().contains("Commit"));
        assert!(dao.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_refuses_persisted_question() {
        let err = dao()
            .create(q1().with_id(QuestionId(4)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::AlreadyPersisted(QuestionId(4))));
    }

    #[tokio::test]
    async fn update_replaces_whole_label_set() {
        let dao = dao();
        let created = dao.create(q1()).await.unwrap();

        let replacement = Question::new("Q1", labels([("en", "Hi")])).with_id(QuestionId(1));
        let echoed = dao.update(replacement.clone()).await.unwrap();
        assert_eq!(echoed, replacement);

        let read = dao.read(created.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(read.labels, labels([("en", "Hi")]));
        assert_eq!(dao.store().label_count().await, 1);
    }

    #[tokio::test]
    async fn update_renames() {
        let dao = dao();
        dao.create(q1()).await.unwrap();

        let renamed = Question::new("Q1b", labels([("en", "Hello")])).with_id(QuestionId(1));
        dao.update(renamed).await.unwrap();

        let read = dao.read(QuestionId(1)).await.unwrap().unwrap();
        assert_eq!(read.name, "Q1b");
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_state() {
        let dao = dao();
        let created = dao.create(q1()).await.unwrap();
        dao.store().fail_next(FailPoint::LabelInsert);

        let replacement = Question::new("Other", labels([("de", "Hallo")])).with_id(QuestionId(1));
        assert!(dao.update(replacement).await.is_err());

        let read = dao.read(QuestionId(1)).await.unwrap();
        assert_eq!(read, Some(created));
    }

    #[tokio::test]
    async fn update_of_missing_question_is_not_found() {
        let dao = dao();
        let ghost = Question::new("Ghost", labels([("en", "Boo")])).with_id(QuestionId(42));

        let err = dao.update(ghost).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(dao.store().label_count().await, 0);
    }

    #[tokio::test]
    async fn update_requires_id() {
        let err = dao().update(q1()).await.unwrap_err();
        assert!(matches!(err, DbError::MissingId));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dao = dao();
        let created = dao.create(q1()).await.unwrap();
        let id = created.id.unwrap();

        assert_eq!(dao.remove(id).await.unwrap(), 1);
        assert_eq!(dao.read(id).await.unwrap(), None);
        assert_eq!(dao.remove(id).await.unwrap(), 0);
        assert_eq!(dao.store().label_count().await, 0);
    }

    #[tokio::test]
    async fn all_lists_in_id_order() {
        let dao = dao();
        dao.create(q1()).await.unwrap();
        dao.create(Question::new("Q2", Labels::new())).await.unwrap();

        let names: Vec<_> = dao
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.name)
            .collect();
        assert_eq!(names, vec!["Q1", "Q2"]);
    }

    #[tokio::test]
    async fn read_failure_reaches_error_callback() {
        let dao = dao();
        dao.store().fail_next(FailPoint::Fetch);

        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let on_ok = Arc::clone(&tx);
        dao.read(QuestionId(1))
            .on_success(move |_| {
                if let Some(tx) = on_ok.lock().unwrap().take() {
                    tx.send("success").unwrap();
                }
            })
            .on_error(move |_| {
                if let Some(tx) = tx.lock().unwrap().take() {
                    tx.send("error").unwrap();
                }
            });

        assert_eq!(rx.await.unwrap(), "error");
    }
}
