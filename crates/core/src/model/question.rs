use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::selection::Selection;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} needs at least 2 options, got {count}")]
    TooFewOptions { id: QuestionId, count: usize },

    #[error("question {id} has an empty option at index {index}")]
    EmptyOption { id: QuestionId, index: usize },

    #[error("question {id} answer index {index} is out of range for {options} options")]
    AnswerOutOfRange {
        id: QuestionId,
        index: usize,
        options: usize,
    },

    #[error("question {id} is declared {kind} but its answer has the other shape")]
    KindMismatch { id: QuestionId, kind: QuestionKind },
}

//
// ─── KIND & ANSWER KEY ─────────────────────────────────────────────────────────
//

/// Whether a question takes exactly one option or any subset of options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multi,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multi => "multi",
        }
    }

    /// Human label used by the exam screen header.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::Single => "Single Choice",
            QuestionKind::Multi => "Multiple Choice",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The correct answer for a question.
///
/// Multi keys are stored as a set, so a bank that lists an index twice
/// still compares equal to a selection containing it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    Single(usize),
    Multi(BTreeSet<usize>),
}

impl AnswerKey {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerKey::Single(_) => QuestionKind::Single,
            AnswerKey::Multi(_) => QuestionKind::Multi,
        }
    }

    /// All-or-nothing comparison against a candidate's selection.
    ///
    /// Single keys need the exact index; multi keys need set equality.
    /// A selection of the wrong shape never matches.
    #[must_use]
    pub fn is_satisfied_by(&self, selection: &Selection) -> bool {
        match (self, selection) {
            (AnswerKey::Single(expected), Selection::Single(chosen)) => expected == chosen,
            (AnswerKey::Multi(expected), Selection::Multi(chosen)) => expected == chosen,
            _ => false,
        }
    }

    fn indices(&self) -> Vec<usize> {
        match self {
            AnswerKey::Single(index) => vec![*index],
            AnswerKey::Multi(set) => set.iter().copied().collect(),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Answer as written in a question bank file: a bare index or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    Index(usize),
    Indices(Vec<usize>),
}

/// Unvalidated question in the question bank layout.
///
/// ```json
/// { "id": 3, "question": "Pick the primes", "type": "multi",
///   "options": ["2", "4", "5"], "answer": [0, 2] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub answer: RawAnswer,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or an option is blank, fewer than two
    /// options exist, an answer index is out of range, or the answer shape does not
    /// match the declared kind.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let answer = match (self.kind, self.answer) {
            (QuestionKind::Single, RawAnswer::Index(index)) => AnswerKey::Single(index),
            (QuestionKind::Multi, RawAnswer::Indices(indices)) => {
                AnswerKey::Multi(indices.into_iter().collect())
            }
            (kind, _) => return Err(QuestionError::KindMismatch { id: self.id, kind }),
        };
        Question::new(self.id, self.prompt, self.options, answer)
    }
}

/// A single exam question. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    answer: AnswerKey,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or an option is blank, fewer than two
    /// options exist, or an answer index is out of range.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        answer: AnswerKey,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id,
                count: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|opt| opt.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { id, index });
        }
        if let Some(index) = answer.indices().into_iter().find(|i| *i >= options.len()) {
            return Err(QuestionError::AnswerOutOfRange {
                id,
                index,
                options: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt,
            options,
            answer,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.answer.kind()
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> &AnswerKey {
        &self.answer
    }

    /// Scores one question.
    ///
    /// An emptied multi selection is stored as no selection, so leaving a
    /// question unanswered matches an empty multi key and nothing else.
    #[must_use]
    pub fn is_answered_correctly(&self, selection: Option<&Selection>) -> bool {
        match (selection, &self.answer) {
            (Some(s), answer) => answer.is_satisfied_by(s),
            (None, AnswerKey::Multi(expected)) => expected.is_empty(),
            (None, AnswerKey::Single(_)) => false,
        }
    }

    /// Converts back into the question bank layout.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        let answer = match &self.answer {
            AnswerKey::Single(index) => RawAnswer::Index(*index),
            AnswerKey::Multi(set) => RawAnswer::Indices(set.iter().copied().collect()),
        };
        QuestionDraft {
            id: self.id,
            prompt: self.prompt.clone(),
            kind: self.kind(),
            options: self.options.clone(),
            answer,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Option {i}")).collect()
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = Question::new(QuestionId::new(1), "  ", options(2), AnswerKey::Single(0))
            .unwrap_err();
        assert!(matches!(err, QuestionError::EmptyPrompt { .. }));
    }

    #[test]
    fn rejects_single_option() {
        let err =
            Question::new(QuestionId::new(1), "Q", options(1), AnswerKey::Single(0)).unwrap_err();
        assert!(matches!(err, QuestionError::TooFewOptions { count: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_answer() {
        let key = AnswerKey::Multi([0, 4].into_iter().collect());
        let err = Question::new(QuestionId::new(1), "Q", options(3), key).unwrap_err();
        assert!(matches!(
            err,
            QuestionError::AnswerOutOfRange {
                index: 4,
                options: 3,
                ..
            }
        ));
    }

    #[test]
    fn draft_parses_bank_layout() {
        let json = r#"{"id": 7, "question": "Pick", "type": "multi",
                       "options": ["a", "b", "c"], "answer": [2, 0, 2]}"#;
        let draft: QuestionDraft = serde_json::from_str(json).unwrap();
        let question = draft.validate().unwrap();

        assert_eq!(question.id(), QuestionId::new(7));
        assert_eq!(question.kind(), QuestionKind::Multi);
        assert_eq!(
            question.answer(),
            &AnswerKey::Multi([0, 2].into_iter().collect())
        );
    }

    #[test]
    fn draft_rejects_shape_mismatch() {
        let draft = QuestionDraft {
            id: QuestionId::new(2),
            prompt: "Q".into(),
            kind: QuestionKind::Single,
            options: options(2),
            answer: RawAnswer::Indices(vec![0]),
        };
        let err = draft.validate().unwrap_err();
        assert!(matches!(
            err,
            QuestionError::KindMismatch {
                kind: QuestionKind::Single,
                ..
            }
        ));
    }

    #[test]
    fn wrong_shape_selection_never_matches() {
        let key = AnswerKey::Single(1);
        assert!(!key.is_satisfied_by(&Selection::Multi([1].into_iter().collect())));
        assert!(key.is_satisfied_by(&Selection::Single(1)));
    }

    #[test]
    fn unanswered_matches_only_empty_multi_key() {
        let empty = Question::new(
            QuestionId::new(7),
            "None apply",
            options(3),
            AnswerKey::Multi(BTreeSet::new()),
        )
        .unwrap();
        assert!(empty.is_answered_correctly(None));
        assert!(!empty.is_answered_correctly(Some(&Selection::Multi([0].into_iter().collect()))));

        let single = Question::new(QuestionId::new(8), "Pick", options(2), AnswerKey::Single(0)).unwrap();
        assert!(!single.is_answered_correctly(None));
    }
}
