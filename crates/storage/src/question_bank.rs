//! Loading question banks from JSON files.
//!
//! The file is a JSON array of questions:
//!
//! ```json
//! [
//!   { "id": 1, "question": "2 + 2 = ?", "type": "single",
//!     "options": ["3", "4"], "answer": 1 },
//!   { "id": 2, "question": "Pick the even numbers", "type": "multi",
//!     "options": ["1", "2", "4"], "answer": [1, 2] }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use exam_core::model::{Question, QuestionDraft, QuestionError, QuestionId};
use thiserror::Error;

use crate::repository::{QuestionBankRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed question bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] QuestionError),
    #[error("question {0} appears more than once in the bank")]
    DuplicateId(QuestionId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Parse and validate a question bank document.
///
/// # Errors
///
/// Returns `QuestionBankError::Json` for malformed JSON and
/// `QuestionBankError::Invalid` for the first question that fails validation
/// and `QuestionBankError::DuplicateId` when two entries share an id.
pub fn parse_question_bank(json: &str) -> Result<Vec<Question>, QuestionBankError> {
    let drafts: Vec<QuestionDraft> = serde_json::from_str(json)?;
    let questions = drafts
        .into_iter()
        .map(|draft| draft.validate().map_err(QuestionBankError::from))
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique_ids(&questions)?;
    Ok(questions)
}

fn ensure_unique_ids(questions: &[Question]) -> Result<(), QuestionBankError> {
    let mut seen = HashSet::with_capacity(questions.len());
    match questions.iter().find(|q| !seen.insert(q.id())) {
        Some(duplicate) => Err(QuestionBankError::DuplicateId(duplicate.id())),
        None => Ok(()),
    }
}

/// Read a question bank file from disk.
///
/// # Errors
///
/// Returns `QuestionBankError` if the file cannot be read or parsed.
pub async fn load_question_bank(path: impl AsRef<Path>) -> Result<Vec<Question>, QuestionBankError> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_question_bank(&raw)
}

/// Replace the stored bank with `questions` in one step. Returns how many
/// were stored.
///
/// Nothing is written when the set carries a duplicate id, and a failed
/// write leaves the previous bank in place.
///
/// # Errors
///
/// Returns `QuestionBankError::DuplicateId` before touching the repository,
/// or `QuestionBankError::Storage` if the repository rejects the write.
pub async fn import_question_bank(
    repo: &dyn QuestionBankRepository,
    questions: &[Question],
) -> Result<usize, QuestionBankError> {
    ensure_unique_ids(questions)?;
    Ok(repo.replace_questions(questions).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use exam_core::model::{QuestionId, QuestionKind};

    const BANK: &str = r#"[
        {"id": 1, "question": "2 + 2 = ?", "type": "single", "options": ["3", "4"], "answer": 1},
        {"id": 2, "question": "Evens", "type": "multi", "options": ["1", "2", "4"], "answer": [2, 1]}
    ]"#;

    #[test]
    fn parses_both_kinds() {
        let questions = parse_question_bank(BANK).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].kind(), QuestionKind::Single);
        assert_eq!(questions[1].kind(), QuestionKind::Multi);
    }

    #[test]
    fn rejects_answer_shape_mismatch() {
        let json = r#"[{"id": 9, "question": "Q", "type": "multi", "options": ["a", "b"], "answer": 1}]"#;
        let err = parse_question_bank(json).unwrap_err();
        assert!(matches!(
            err,
            QuestionBankError::Invalid(QuestionError::KindMismatch { id, .. }) if id == QuestionId::new(9)
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_question_bank("{not json").unwrap_err();
        assert!(matches!(err, QuestionBankError::Json(_)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[
            {"id": 1, "question": "First", "type": "single", "options": ["a", "b"], "answer": 0},
            {"id": 1, "question": "Second", "type": "single", "options": ["c", "d"], "answer": 1}
        ]"#;
        let err = parse_question_bank(json).unwrap_err();
        assert!(matches!(err, QuestionBankError::DuplicateId(id) if id == QuestionId::new(1)));
    }

    #[tokio::test]
    async fn import_with_duplicate_ids_keeps_previous_bank() {
        let repo = InMemoryRepository::new();
        let first = parse_question_bank(BANK).unwrap();
        import_question_bank(&repo, &first).await.unwrap();

        let twice = vec![first[0].clone(), first[0].clone()];
        let err = import_question_bank(&repo, &twice).await.unwrap_err();

        assert!(matches!(err, QuestionBankError::DuplicateId(id) if id == QuestionId::new(1)));
        let listed = repo.list_questions().await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn import_reports_stored_count() {
        let repo = InMemoryRepository::new();
        let questions = parse_question_bank(BANK).unwrap();
        let stored = import_question_bank(&repo, &questions).await.unwrap();
        assert_eq!(stored, repo.list_questions().await.unwrap().len());
    }

    #[tokio::test]
    async fn import_replaces_existing_bank() {
        let repo = InMemoryRepository::new();
        let first = parse_question_bank(BANK).unwrap();
        import_question_bank(&repo, &first).await.unwrap();

        let replacement = parse_question_bank(
            r#"[{"id": 5, "question": "Only", "type": "single", "options": ["a", "b"], "answer": 0}]"#,
        )
        .unwrap();
        let stored = import_question_bank(&repo, &replacement).await.unwrap();

        assert_eq!(stored, 1);
        let listed = repo.list_questions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), QuestionId::new(5));
    }
}
