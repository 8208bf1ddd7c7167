//! `PostgreSQL` implementation of the question store.
//!
//! Label rows reference their question through an `ON DELETE CASCADE`
//! foreign key, so deleting a question is a single statement. Label
//! batches are written with one `UNNEST`-based insert instead of one
//! statement per row.

use lexicon_types::{Labels, QuestionId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::aggregate::QuestionRow;
use crate::error::DbError;
use crate::store::{QuestionStore, StoreTransaction};

/// Question store over a shared [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl QuestionStore for PgQuestionStore {
    type Transaction = PgStoreTransaction;

    async fn begin(&self) -> Result<PgStoreTransaction, DbError> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTransaction { tx })
    }

    async fn fetch_rows(&self, id: Option<QuestionId>) -> Result<Vec<QuestionRow>, DbError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r"SELECT questions.id, questions.name, labels.language, labels.value
              FROM questions
              LEFT OUTER JOIN labels
              ON labels.question_id = questions.id
              WHERE $1::INTEGER IS NULL OR questions.id = $1
              ORDER BY questions.id, labels.id",
        )
        .bind(id.map(QuestionId::into_inner))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<u64, DbError> {
        let result = sqlx::query(r"DELETE FROM questions WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// An open `PostgreSQL` transaction.
///
/// Dropping it without calling [`StoreTransaction::commit`] rolls back
/// when the connection returns to the pool.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

impl StoreTransaction for PgStoreTransaction {
    async fn insert_question(&mut self, name: &str) -> Result<QuestionId, DbError> {
        let row: (i32,) = sqlx::query_as(r"INSERT INTO questions (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(QuestionId(row.0))
    }

    async fn update_question_name(&mut self, id: QuestionId, name: &str) -> Result<u64, DbError> {
        let result = sqlx::query(r"UPDATE questions SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id.into_inner())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_labels(&mut self, id: QuestionId) -> Result<u64, DbError> {
        let result = sqlx::query(r"DELETE FROM labels WHERE question_id = $1")
            .bind(id.into_inner())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_labels(&mut self, id: QuestionId, labels: &Labels) -> Result<(), DbError> {
        if labels.is_empty() {
            return Ok(());
        }

        let (languages, values): (Vec<String>, Vec<String>) = labels
            .iter()
            .map(|(language, value)| (language.clone(), value.clone()))
            .unzip();

        sqlx::query(
            r"INSERT INTO labels (language, value, question_id)
              SELECT language, value, $3
              FROM UNNEST($1::TEXT[], $2::TEXT[]) AS batch (language, value)",
        )
        .bind(languages)
        .bind(values)
        .bind(id.into_inner())
        .execute(&mut *self.tx)
        .await?;

        tracing::debug!(question_id = %id, count = labels.len(), "Inserted labels (batch UNNEST)");
        Ok(())
    }

    async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
