use exam_core::model::{ExamResult, ResultId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{map_result_row, ser};
use crate::repository::{ExamResultRepository, ExamResultRow, StorageError};

fn map_result_row_with_id(row: &sqlx::sqlite::SqliteRow) -> Result<ExamResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let result = map_result_row(row)?;
    Ok(ExamResultRow::new(ResultId::new(id), result))
}

#[async_trait::async_trait]
impl ExamResultRepository for SqliteRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<ResultId, StorageError> {
        let card = result.score_card();
        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    candidate, score, total, answered,
                    started_at, completed_at, reason
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(result.candidate())
        .bind(i64::from(card.score()))
        .bind(i64::from(card.total()))
        .bind(i64::from(result.answered()))
        .bind(result.started_at())
        .bind(result.completed_at())
        .bind(result.reason().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(ResultId::new(res.last_insert_rowid()))
    }

    async fn get_result(&self, id: ResultId) -> Result<ExamResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    candidate, score, total, answered,
                    started_at, completed_at, reason
                FROM exam_results
                WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<ExamResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, candidate, score, total, answered,
                    started_at, completed_at, reason
                FROM exam_results
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row_with_id(&row)?);
        }
        Ok(out)
    }
}
