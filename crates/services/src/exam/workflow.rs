use std::path::Path;
use std::sync::Arc;

use exam_core::time::DEFAULT_EXAM_SECONDS;
use exam_core::{Clock, ExamSession};
use storage::question_bank::{import_question_bank, load_question_bank};
use storage::repository::{ExamResultRepository, QuestionBankRepository};
use tracing::info;

use super::controller::{ExamController, ExamHandle};
use super::sink::{RepositoryResultSink, ResultSink};
use crate::error::ExamServiceError;

/// Loads the question bank, starts sessions and hands them to a controller.
#[derive(Clone)]
pub struct ExamWorkflowService {
    clock: Clock,
    questions: Arc<dyn QuestionBankRepository>,
    sink: Arc<dyn ResultSink>,
    exam_seconds: u32,
    seed: Option<u64>,
}

impl ExamWorkflowService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionBankRepository>,
        results: Arc<dyn ExamResultRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            sink: Arc::new(RepositoryResultSink::new(results)),
            exam_seconds: DEFAULT_EXAM_SECONDS,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_exam_seconds(mut self, exam_seconds: u32) -> Self {
        self.exam_seconds = exam_seconds;
        self
    }

    /// Pin the shuffle seed so every session has the same question order.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn exam_seconds(&self) -> u32 {
        self.exam_seconds
    }

    /// Build a session from the stored question bank without driving it.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::NoQuestions` for an empty bank, or storage and
    /// session start failures.
    pub async fn start_session(&self) -> Result<ExamSession, ExamServiceError> {
        let questions = self.questions.list_questions().await?;
        if questions.is_empty() {
            return Err(ExamServiceError::NoQuestions);
        }
        let seed = self.seed.unwrap_or_else(rand::random::<u64>);
        let session =
            ExamSession::start_with_seed(questions, self.exam_seconds, seed, self.clock.now())?;
        Ok(session)
    }

    /// Start a timed exam for `candidate`.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if no session can be started or the candidate
    /// name is blank.
    pub async fn start_exam(&self, candidate: &str) -> Result<ExamHandle, ExamServiceError> {
        let session = self.start_session().await?;
        ExamController::spawn(session, candidate, Arc::clone(&self.sink), self.clock)
    }

    /// Replace the stored question bank with the contents of a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::QuestionBank` if the file cannot be read,
    /// parsed or stored.
    pub async fn import_bank(&self, path: impl AsRef<Path>) -> Result<usize, ExamServiceError> {
        let path = path.as_ref();
        let questions = load_question_bank(path).await?;
        let stored = import_question_bank(self.questions.as_ref(), &questions).await?;
        info!(path = %path.display(), stored, "question bank imported");
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` on repository failures.
    pub async fn question_count(&self) -> Result<usize, ExamServiceError> {
        Ok(self.questions.list_questions().await?.len())
    }
}
