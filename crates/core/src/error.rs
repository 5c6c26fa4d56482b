use thiserror::Error;

use crate::model::{ExamResultError, ProfileError, QuestionError, ScoreCardError};
use crate::session::ExamSessionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Session(#[from] ExamSessionError),
    #[error(transparent)]
    ScoreCard(#[from] ScoreCardError),
    #[error(transparent)]
    Result(#[from] ExamResultError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}
