use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::score::ScoreCard;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("answered count ({answered}) exceeds total ({total})")]
    AnsweredExceedsTotal { answered: u32, total: u32 },

    #[error("candidate name cannot be empty")]
    EmptyCandidate,
}

/// Why an attempt was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The candidate confirmed submission.
    Manual,
    /// The countdown reached zero.
    TimedOut,
}

impl SubmitReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitReason::Manual => "manual",
            SubmitReason::TimedOut => "timed_out",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "manual" => Some(SubmitReason::Manual),
            "timed_out" => Some(SubmitReason::TimedOut),
            _ => None,
        }
    }
}

/// A finished exam attempt as handed to the result sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    candidate: String,
    score_card: ScoreCard,
    answered: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    reason: SubmitReason,
}

impl ExamResult {
    /// Build (or rehydrate) a result.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` if the time range is inverted, the candidate is blank,
    /// or more questions are reported answered than exist.
    pub fn new(
        candidate: impl Into<String>,
        score_card: ScoreCard,
        answered: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        reason: SubmitReason,
    ) -> Result<Self, ExamResultError> {
        let candidate = candidate.into();
        if candidate.trim().is_empty() {
            return Err(ExamResultError::EmptyCandidate);
        }
        if completed_at < started_at {
            return Err(ExamResultError::InvalidTimeRange);
        }
        if answered > score_card.total() {
            return Err(ExamResultError::AnsweredExceedsTotal {
                answered,
                total: score_card.total(),
            });
        }
        Ok(Self {
            candidate,
            score_card,
            answered,
            started_at,
            completed_at,
            reason,
        })
    }

    #[must_use]
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    #[must_use]
    pub fn score_card(&self) -> ScoreCard {
        self.score_card
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn reason(&self) -> SubmitReason {
        self.reason
    }

    /// Whole seconds spent between start and submission.
    #[must_use]
    pub fn elapsed_secs(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_inverted_time_range() {
        let now = fixed_now();
        let card = ScoreCard::new(1, 2).unwrap();
        let err = ExamResult::new(
            "Asha",
            card,
            2,
            now,
            now - chrono::Duration::seconds(1),
            SubmitReason::Manual,
        )
        .unwrap_err();
        assert_eq!(err, ExamResultError::InvalidTimeRange);
    }

    #[test]
    fn reason_round_trips_through_str() {
        for reason in [SubmitReason::Manual, SubmitReason::TimedOut] {
            assert_eq!(SubmitReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(SubmitReason::parse("other"), None);
    }
}
