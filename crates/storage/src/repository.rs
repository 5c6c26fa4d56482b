use async_trait::async_trait;
use exam_core::model::{ExamResult, Profile, Question, QuestionId, ResultId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Source of exam questions.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Persist or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch the full question set ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Remove every question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_questions(&self) -> Result<(), StorageError>;

    /// Swap the whole bank for `questions` atomically and return the number
    /// of stored rows. On failure the previous bank is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn replace_questions(&self, questions: &[Question]) -> Result<usize, StorageError>;
}

/// Single remembered candidate profile.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn get_profile(&self) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_profile(&self) -> Result<(), StorageError>;
}

/// A stored exam result together with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResultRow {
    pub id: ResultId,
    pub result: ExamResult,
}

impl ExamResultRow {
    #[must_use]
    pub fn new(id: ResultId, result: ExamResult) -> Self {
        Self { id, result }
    }
}

/// History of finished attempts.
#[async_trait]
pub trait ExamResultRepository: Send + Sync {
    /// Append a result and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &ExamResult) -> Result<ResultId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<ExamResult, StorageError>;

    /// Most recent results first, by completion time then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_results(&self, limit: u32) -> Result<Vec<ExamResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    profile: Arc<Mutex<Option<Profile>>>,
    results: Arc<Mutex<Vec<ExamResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    async fn clear_questions(&self) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.clear();
        Ok(())
    }

    async fn replace_questions(&self, questions: &[Question]) -> Result<usize, StorageError> {
        let bank: BTreeMap<_, _> = questions.iter().map(|q| (q.id(), q.clone())).collect();
        let mut guard = self.questions.lock().map_err(poisoned)?;
        *guard = bank;
        Ok(guard.len())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self) -> Result<Option<Profile>, StorageError> {
        let guard = self.profile.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self.profile.lock().map_err(poisoned)?;
        *guard = Some(profile.clone());
        Ok(())
    }

    async fn clear_profile(&self) -> Result<(), StorageError> {
        let mut guard = self.profile.lock().map_err(poisoned)?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl ExamResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<ResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        guard.push(result.clone());
        let id = i64::try_from(guard.len()).map_err(|_| StorageError::Conflict)?;
        Ok(ResultId::new(id))
    }

    async fn get_result(&self, id: ResultId) -> Result<ExamResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        id.value()
            .checked_sub(1)
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| guard.get(idx))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<ExamResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<ExamResultRow> = guard
            .iter()
            .enumerate()
            .filter_map(|(idx, result)| {
                let id = i64::try_from(idx + 1).ok()?;
                Some(ExamResultRow::new(ResultId::new(id), result.clone()))
            })
            .collect();
        rows.sort_by(|a, b| {
            b.result
                .completed_at()
                .cmp(&a.result.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBankRepository>,
    pub profile: Arc<dyn ProfileRepository>,
    pub results: Arc<dyn ExamResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionBankRepository> = Arc::new(repo.clone());
        let profile: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo);
        Self {
            questions,
            profile,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerKey, ScoreCard, SubmitReason};
    use exam_core::time::fixed_now;

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["yes".into(), "no".into()],
            AnswerKey::Single(0),
        )
        .unwrap()
    }

    fn build_result(score: u32, offset_secs: i64) -> ExamResult {
        let now = fixed_now();
        ExamResult::new(
            "Asha",
            ScoreCard::new(score, 5).unwrap(),
            5,
            now,
            now + chrono::Duration::seconds(offset_secs),
            SubmitReason::Manual,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn questions_upsert_replaces_by_id() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question(2)).await.unwrap();
        repo.upsert_question(&build_question(1)).await.unwrap();
        repo.upsert_question(&build_question(2)).await.unwrap();

        let listed = repo.list_questions().await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);

        repo.clear_questions().await.unwrap();
        assert!(repo.list_questions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_questions_swaps_whole_bank() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question(1)).await.unwrap();
        repo.upsert_question(&build_question(2)).await.unwrap();

        let stored = repo
            .replace_questions(&[build_question(7), build_question(3)])
            .await
            .unwrap();

        assert_eq!(stored, 2);
        let ids: Vec<u64> = repo.list_questions().await.unwrap().iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[tokio::test]
    async fn profile_save_and_clear() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_profile().await.unwrap().is_none());

        let profile = Profile::new("asha", Some("Asha".into())).unwrap();
        repo.save_profile(&profile).await.unwrap();
        assert_eq!(repo.get_profile().await.unwrap(), Some(profile));

        repo.clear_profile().await.unwrap();
        assert!(repo.get_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn results_list_newest_first() {
        let repo = InMemoryRepository::new();
        let older = repo.append_result(&build_result(1, 10)).await.unwrap();
        let newer = repo.append_result(&build_result(4, 60)).await.unwrap();

        let rows = repo.list_results(10).await.unwrap();
        assert_eq!(rows[0].id, newer);
        assert_eq!(rows[1].id, older);
        assert_eq!(repo.get_result(older).await.unwrap().score_card().score(), 1);

        assert_eq!(repo.list_results(1).await.unwrap().len(), 1);
        assert!(matches!(
            repo.get_result(ResultId::new(99)).await,
            Err(StorageError::NotFound)
        ));
    }
}
