use async_trait::async_trait;
use exam_core::model::Question;
use sqlx::{Executor, Sqlite};

use super::SqliteRepository;
use super::mapping::{map_question_row, question_id_to_i64, ser};
use crate::repository::{QuestionBankRepository, StorageError};

fn conn<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn write_question<'e, E>(executor: E, question: &Question) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let draft = question.to_draft();
    let options = serde_json::to_string(&draft.options).map_err(ser)?;
    let answer = serde_json::to_string(&draft.answer).map_err(ser)?;

    sqlx::query(
        r"
            INSERT INTO questions (id, prompt, kind, options, answer)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                prompt = excluded.prompt,
                kind = excluded.kind,
                options = excluded.options,
                answer = excluded.answer
        ",
    )
    .bind(question_id_to_i64(question.id())?)
    .bind(question.prompt())
    .bind(question.kind().as_str())
    .bind(options)
    .bind(answer)
    .execute(executor)
    .await
    .map_err(conn)?;

    Ok(())
}

#[async_trait]
impl QuestionBankRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        write_question(&self.pool, question).await
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, prompt, kind, options, answer
                FROM questions
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn clear_questions(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM questions")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn replace_questions(&self, questions: &[Question]) -> Result<usize, StorageError> {
        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await.map_err(conn)?;
        sqlx::query("DELETE FROM questions")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        for question in questions {
            write_question(&mut *tx, question).await?;
        }
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;
        tx.commit().await.map_err(conn)?;

        usize::try_from(stored).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}
