//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::ExamSessionError;
use exam_core::model::{ExamResultError, ProfileError};
use storage::question_bank::QuestionBankError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the exam workflow and the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServiceError {
    #[error("no questions available for the exam")]
    NoQuestions,
    #[error("candidate name is required")]
    EmptyCandidate,
    #[error("exam session is not in progress")]
    NotInProgress,
    #[error("exam controller has stopped")]
    ControllerGone,
    #[error(transparent)]
    Session(#[from] ExamSessionError),
    #[error(transparent)]
    Result(#[from] ExamResultError),
    #[error(transparent)]
    QuestionBank(#[from] QuestionBankError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error("auth request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("auth server sent an unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Profile(#[from] ProfileServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
