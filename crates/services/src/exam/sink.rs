use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{ExamResult, ResultId};
use storage::repository::{ExamResultRepository, StorageError};

/// Consumer of finished exam attempts.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Record a finished attempt and return its stored id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result could not be recorded.
    async fn record(&self, result: &ExamResult) -> Result<ResultId, StorageError>;
}

/// Stores results through an `ExamResultRepository`.
#[derive(Clone)]
pub struct RepositoryResultSink {
    results: Arc<dyn ExamResultRepository>,
}

impl RepositoryResultSink {
    #[must_use]
    pub fn new(results: Arc<dyn ExamResultRepository>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl ResultSink for RepositoryResultSink {
    async fn record(&self, result: &ExamResult) -> Result<ResultId, StorageError> {
        self.results.append_result(result).await
    }
}
