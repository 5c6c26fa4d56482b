use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreCardError {
    #[error("score card total must be > 0")]
    EmptyTotal,

    #[error("score {score} exceeds total {total}")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// Letter grade shown on the score card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    APlus,
    A,
    BPlus,
    B,
    CPlus,
    C,
}

impl LetterGrade {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
        }
    }
}

impl std::fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse performance band, used to color the score card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    Excellent,
    Good,
    Average,
    Poor,
}

/// Percentage at or above which an attempt counts as passed.
pub const PASS_PERCENTAGE: u32 = 70;

/// Final `{score, total}` of an exam attempt.
///
/// Threshold checks are done in integer arithmetic (`score * 100 >= p * total`)
/// so boundaries like exactly 70% are never lost to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    score: u32,
    total: u32,
}

impl ScoreCard {
    /// # Errors
    ///
    /// Returns `ScoreCardError` if `total` is zero or `score > total`.
    pub fn new(score: u32, total: u32) -> Result<Self, ScoreCardError> {
        if total == 0 {
            return Err(ScoreCardError::EmptyTotal);
        }
        if score > total {
            return Err(ScoreCardError::ScoreExceedsTotal { score, total });
        }
        Ok(Self { score, total })
    }

    /// Tally produced by a session; callers guarantee `0 < total` and `score <= total`.
    pub(crate) fn tally(score: u32, total: u32) -> Self {
        Self { score, total }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of questions not awarded a point (wrong or unanswered).
    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.total - self.score
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.score) * 100.0 / f64::from(self.total)
    }

    /// Percentage rounded half-up to a whole number.
    #[must_use]
    pub fn rounded_percentage(&self) -> u32 {
        let scaled = u64::from(self.score) * 200 + u64::from(self.total);
        let rounded = scaled / (u64::from(self.total) * 2);
        u32::try_from(rounded).unwrap_or(100)
    }

    fn at_least(&self, percent: u32) -> bool {
        u64::from(self.score) * 100 >= u64::from(percent) * u64::from(self.total)
    }

    #[must_use]
    pub fn grade(&self) -> LetterGrade {
        if self.at_least(90) {
            LetterGrade::APlus
        } else if self.at_least(80) {
            LetterGrade::A
        } else if self.at_least(70) {
            LetterGrade::BPlus
        } else if self.at_least(60) {
            LetterGrade::B
        } else if self.at_least(50) {
            LetterGrade::CPlus
        } else {
            LetterGrade::C
        }
    }

    #[must_use]
    pub fn band(&self) -> ScoreBand {
        if self.at_least(90) {
            ScoreBand::Excellent
        } else if self.at_least(70) {
            ScoreBand::Good
        } else if self.at_least(50) {
            ScoreBand::Average
        } else {
            ScoreBand::Poor
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.at_least(PASS_PERCENTAGE)
    }
}
