use std::sync::Arc;

use chrono::{DateTime, Utc};
use exam_core::model::{ExamResult, LetterGrade, ResultId, ScoreBand, SubmitReason};
use storage::repository::{ExamResultRepository, ExamResultRow};

use crate::error::ExamServiceError;

/// Presentation-agnostic list item for a stored exam result.
///
/// Timestamps stay as `DateTime<Utc>`; the front end formats them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResultListItem {
    pub id: ResultId,
    pub candidate: String,
    pub completed_at: DateTime<Utc>,
    pub reason: SubmitReason,

    pub score: u32,
    pub total: u32,
    pub answered: u32,
    pub percentage: u32,
    pub grade: LetterGrade,
    pub band: ScoreBand,
    pub passed: bool,
    pub elapsed_secs: i64,
}

impl ExamResultListItem {
    #[must_use]
    pub fn from_result(id: ResultId, result: &ExamResult) -> Self {
        let card = result.score_card();
        Self {
            id,
            candidate: result.candidate().to_owned(),
            completed_at: result.completed_at(),
            reason: result.reason(),
            score: card.score(),
            total: card.total(),
            answered: result.answered(),
            percentage: card.rounded_percentage(),
            grade: card.grade(),
            band: card.band(),
            passed: card.passed(),
            elapsed_secs: result.elapsed_secs(),
        }
    }

    #[must_use]
    pub fn from_row(row: &ExamResultRow) -> Self {
        Self::from_result(row.id, &row.result)
    }
}

/// Read side of the result history.
#[derive(Clone)]
pub struct ExamResultService {
    results: Arc<dyn ExamResultRepository>,
}

impl ExamResultService {
    #[must_use]
    pub fn new(results: Arc<dyn ExamResultRepository>) -> Self {
        Self { results }
    }

    /// Most recent results first.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` on repository failures.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ExamResultListItem>, ExamServiceError> {
        let rows = self.results.list_results(limit).await?;
        Ok(rows.iter().map(ExamResultListItem::from_row).collect())
    }

    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if the result does not exist.
    pub async fn get(&self, id: ResultId) -> Result<ExamResultListItem, ExamServiceError> {
        let result = self.results.get_result(id).await?;
        Ok(ExamResultListItem::from_result(id, &result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::ScoreCard;
    use exam_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    fn result(score: u32, offset_secs: i64) -> ExamResult {
        let started = fixed_now() + Duration::seconds(offset_secs);
        ExamResult::new(
            "Asha",
            ScoreCard::new(score, 10).unwrap(),
            10,
            started,
            started + Duration::seconds(95),
            SubmitReason::Manual,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn list_recent_returns_newest_first_with_grades() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.append_result(&result(9, 0)).await.unwrap();
        repo.append_result(&result(4, 600)).await.unwrap();
        let service = ExamResultService::new(repo);

        let items = service.list_recent(5).await.unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].score, 4);
        assert_eq!(items[0].grade, LetterGrade::C);
        assert!(!items[0].passed);

        assert_eq!(items[1].percentage, 90);
        assert_eq!(items[1].grade, LetterGrade::APlus);
        assert_eq!(items[1].band, ScoreBand::Excellent);
        assert_eq!(items[1].elapsed_secs, 95);
    }

    #[tokio::test]
    async fn get_missing_result_is_not_found() {
        let service = ExamResultService::new(Arc::new(InMemoryRepository::new()));
        let err = service.get(ResultId::new(3)).await.unwrap_err();
        assert!(matches!(
            err,
            ExamServiceError::Storage(StorageError::NotFound)
        ));
    }
}
