use exam_core::model::{
    ExamResult, Question, QuestionDraft, QuestionId, QuestionKind, RawAnswer, ScoreCard,
    SubmitReason,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization("question_id sign overflow".into()))
}

pub(crate) fn parse_kind(s: &str) -> Result<QuestionKind, StorageError> {
    match s {
        "single" => Ok(QuestionKind::Single),
        "multi" => Ok(QuestionKind::Multi),
        _ => Err(StorageError::Serialization(format!("invalid kind: {s}"))),
    }
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let kind = parse_kind(&row.try_get::<String, _>("kind").map_err(ser)?)?;
    let options: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("options").map_err(ser)?).map_err(ser)?;
    let answer: RawAnswer =
        serde_json::from_str(&row.try_get::<String, _>("answer").map_err(ser)?).map_err(ser)?;

    QuestionDraft {
        id,
        prompt: row.try_get("prompt").map_err(ser)?,
        kind,
        options,
        answer,
    }
    .validate()
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamResult, StorageError> {
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let answered = u32_from_i64("answered", row.try_get::<i64, _>("answered").map_err(ser)?)?;
    let raw_reason: String = row.try_get("reason").map_err(ser)?;
    let reason = SubmitReason::parse(&raw_reason)
        .ok_or_else(|| StorageError::Serialization(format!("invalid reason: {raw_reason}")))?;

    ExamResult::new(
        row.try_get::<String, _>("candidate").map_err(ser)?,
        ScoreCard::new(score, total).map_err(ser)?,
        answered,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        reason,
    )
    .map_err(ser)
}
