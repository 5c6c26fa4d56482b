use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Question, QuestionId, QuestionKind, ScoreCard, Selection, SubmitReason};
use crate::shuffle::{permute, random_seed};

//
// ─── PHASE & OPERATIONS ────────────────────────────────────────────────────────
//

/// Lifecycle stage of an exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    InProgress,
    /// Score is frozen and being handed to the result sink.
    Submitting,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::InProgress => "in progress",
            Phase::Submitting => "submitting",
            Phase::Completed => "completed",
        })
    }
}

/// Engine operations, named in `InvalidTransition` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Tick,
    SelectAnswer,
    ClearAnswer,
    Navigate,
    Submit,
    CompleteSubmission,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Tick => "tick",
            Operation::SelectAnswer => "select an answer",
            Operation::ClearAnswer => "clear an answer",
            Operation::Navigate => "navigate",
            Operation::Submit => "submit",
            Operation::CompleteSubmission => "complete submission",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// What a single countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining: u32 },
    /// The clock hit zero and the session was submitted.
    TimedOut(ScoreCard),
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Contract violations raised by the session engine.
///
/// None of these are recoverable at runtime; they indicate a caller bug.
/// The session state is never modified when an error is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamSessionError {
    #[error("cannot {operation} while the session is {phase}")]
    InvalidTransition { operation: Operation, phase: Phase },

    #[error("option {option} is out of range for question {question_id} ({options} options)")]
    OutOfRangeSelection {
        question_id: QuestionId,
        option: usize,
        options: usize,
    },

    #[error("cannot start a session without questions")]
    EmptyQuestionSet,

    #[error("exam duration must be > 0 seconds")]
    ZeroDuration,

    #[error("question {0} appears more than once in the question set")]
    DuplicateQuestion(QuestionId),

    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("question index {index} is out of range for {total} questions")]
    OutOfRangeQuestion { index: usize, total: usize },
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub current_index: usize,
    pub remaining_seconds: u32,
    pub phase: Phase,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One exam attempt: a fixed question order, the countdown and the answers.
///
/// The session is a pure state machine. It never reads the wall clock and never
/// performs I/O; timestamps are passed in by the owner.
///
/// ```text
/// InProgress --(submit | tick to zero)--> Submitting --> Completed
/// ```
///
/// By default both steps happen inside one call. With
/// [`ExamSession::with_deferred_completion`] the session stops at `Submitting`
/// until [`ExamSession::complete_submission`] is called, so an owner can hand the
/// frozen score to a sink first.
pub struct ExamSession {
    questions: Vec<Question>,
    positions: HashMap<QuestionId, usize>,
    answers: HashMap<QuestionId, Selection>,
    current: usize,
    total_seconds: u32,
    remaining_seconds: u32,
    phase: Phase,
    seed: u64,
    deferred_completion: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    submit_reason: Option<SubmitReason>,
    score_card: Option<ScoreCard>,
}

impl ExamSession {
    /// Start a session with a freshly drawn shuffle seed.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::EmptyQuestionSet`, `ZeroDuration` or
    /// `DuplicateQuestion` if the inputs cannot form a session.
    pub fn start(
        questions: Vec<Question>,
        total_seconds: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, ExamSessionError> {
        Self::start_with_seed(questions, total_seconds, random_seed(), started_at)
    }

    /// Start a session whose question order is fully determined by `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::EmptyQuestionSet`, `ZeroDuration` or
    /// `DuplicateQuestion` if the inputs cannot form a session.
    pub fn start_with_seed(
        questions: Vec<Question>,
        total_seconds: u32,
        seed: u64,
        started_at: DateTime<Utc>,
    ) -> Result<Self, ExamSessionError> {
        if questions.is_empty() {
            return Err(ExamSessionError::EmptyQuestionSet);
        }
        if total_seconds == 0 {
            return Err(ExamSessionError::ZeroDuration);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(ExamSessionError::DuplicateQuestion(question.id()));
            }
        }

        let questions = permute(questions, seed);
        let positions = questions
            .iter()
            .enumerate()
            .map(|(pos, q)| (q.id(), pos))
            .collect();

        Ok(Self {
            questions,
            positions,
            answers: HashMap::new(),
            current: 0,
            total_seconds,
            remaining_seconds: total_seconds,
            phase: Phase::InProgress,
            seed,
            deferred_completion: false,
            started_at,
            completed_at: None,
            submit_reason: None,
            score_card: None,
        })
    }

    /// Stop at `Submitting` after submission instead of completing immediately.
    #[must_use]
    pub fn with_deferred_completion(mut self, deferred: bool) -> Self {
        self.deferred_completion = deferred;
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.positions.get(&id).map(|pos| &self.questions[*pos])
    }

    #[must_use]
    pub fn selection(&self, id: QuestionId) -> Option<&Selection> {
        self.answers.get(&id)
    }

    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answers.contains_key(&id)
    }

    /// Number of questions with a recorded selection.
    ///
    /// Multi selections that were toggled back to empty are removed, so they do
    /// not count here.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.submit_reason
    }

    /// The frozen score, available from `Submitting` onwards.
    #[must_use]
    pub fn score_card(&self) -> Option<ScoreCard> {
        self.score_card
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.answered_count();
        SessionProgress {
            total: self.questions.len(),
            answered,
            unanswered: self.questions.len().saturating_sub(answered),
            current_index: self.current,
            remaining_seconds: self.remaining_seconds,
            phase: self.phase,
        }
    }

    fn ensure_in_progress(&self, operation: Operation) -> Result<(), ExamSessionError> {
        if self.phase == Phase::InProgress {
            Ok(())
        } else {
            Err(ExamSessionError::InvalidTransition {
                operation,
                phase: self.phase,
            })
        }
    }

    fn position_of(&self, id: QuestionId) -> Result<usize, ExamSessionError> {
        self.positions
            .get(&id)
            .copied()
            .ok_or(ExamSessionError::UnknownQuestion(id))
    }

    /// Count down one second; submits when the clock reaches zero.
    ///
    /// `now` is used as the completion time if this tick ends the exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::InvalidTransition` unless the session is in progress.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, ExamSessionError> {
        self.ensure_in_progress(Operation::Tick)?;
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Ok(TickOutcome::Running {
                remaining: self.remaining_seconds,
            });
        }
        let card = self.submit_with_reason(SubmitReason::TimedOut, now)?;
        Ok(TickOutcome::TimedOut(card))
    }

    /// Record a choice for `id`.
    ///
    /// Single questions replace the previous choice. Multi questions toggle the
    /// option; removing the last option deletes the entry. Returns the selection
    /// now stored for the question, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless in progress, `UnknownQuestion` for a
    /// foreign id, and `OutOfRangeSelection` for a bad option index.
    pub fn select_answer(
        &mut self,
        id: QuestionId,
        option: usize,
    ) -> Result<Option<&Selection>, ExamSessionError> {
        self.ensure_in_progress(Operation::SelectAnswer)?;
        let pos = self.position_of(id)?;
        let question = &self.questions[pos];
        let options = question.options().len();
        if option >= options {
            return Err(ExamSessionError::OutOfRangeSelection {
                question_id: id,
                option,
                options,
            });
        }

        match question.kind() {
            QuestionKind::Single => {
                self.answers.insert(id, Selection::Single(option));
            }
            QuestionKind::Multi => {
                let mut set = match self.answers.remove(&id) {
                    Some(Selection::Multi(set)) => set,
                    _ => Default::default(),
                };
                if !set.remove(&option) {
                    set.insert(option);
                }
                if !set.is_empty() {
                    self.answers.insert(id, Selection::Multi(set));
                }
            }
        }

        Ok(self.answers.get(&id))
    }

    /// Select an option on the question currently shown.
    ///
    /// # Errors
    ///
    /// Same as [`ExamSession::select_answer`].
    pub fn select_current(&mut self, option: usize) -> Result<Option<&Selection>, ExamSessionError> {
        let id = self.current_question().id();
        self.select_answer(id, option)
    }

    /// Remove any selection for `id`. Returns whether something was removed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless in progress and `UnknownQuestion` for a
    /// foreign id.
    pub fn clear_answer(&mut self, id: QuestionId) -> Result<bool, ExamSessionError> {
        self.ensure_in_progress(Operation::ClearAnswer)?;
        self.position_of(id)?;
        Ok(self.answers.remove(&id).is_some())
    }

    /// Move one question back or forward. Moving past either end is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless in progress.
    pub fn navigate(&mut self, direction: Direction) -> Result<usize, ExamSessionError> {
        self.ensure_in_progress(Operation::Navigate)?;
        let last = self.questions.len() - 1;
        self.current = match direction {
            Direction::Previous => self.current.saturating_sub(1),
            Direction::Next => (self.current + 1).min(last),
        };
        Ok(self.current)
    }

    /// Jump straight to the question at `index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless in progress and `OutOfRangeQuestion` for
    /// an index past the end.
    pub fn go_to(&mut self, index: usize) -> Result<usize, ExamSessionError> {
        self.ensure_in_progress(Operation::Navigate)?;
        if index >= self.questions.len() {
            return Err(ExamSessionError::OutOfRangeQuestion {
                index,
                total: self.questions.len(),
            });
        }
        self.current = index;
        Ok(self.current)
    }

    /// Submit on the candidate's request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the session was already submitted.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<ScoreCard, ExamSessionError> {
        self.submit_with_reason(SubmitReason::Manual, now)
    }

    fn submit_with_reason(
        &mut self,
        reason: SubmitReason,
        now: DateTime<Utc>,
    ) -> Result<ScoreCard, ExamSessionError> {
        let card = self.begin_submission(reason, now)?;
        if !self.deferred_completion {
            self.complete_submission()?;
        }
        Ok(card)
    }

    /// Freeze answers and the clock, compute the score and enter `Submitting`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless in progress.
    pub fn begin_submission(
        &mut self,
        reason: SubmitReason,
        now: DateTime<Utc>,
    ) -> Result<ScoreCard, ExamSessionError> {
        self.ensure_in_progress(Operation::Submit)?;
        let card = self.compute_score();
        self.phase = Phase::Submitting;
        self.submit_reason = Some(reason);
        self.completed_at = Some(now.max(self.started_at));
        self.score_card = Some(card);
        Ok(card)
    }

    /// Finish a submission started with [`ExamSession::begin_submission`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is `Submitting`.
    pub fn complete_submission(&mut self) -> Result<ScoreCard, ExamSessionError> {
        let (Phase::Submitting, Some(card)) = (self.phase, self.score_card) else {
            return Err(ExamSessionError::InvalidTransition {
                operation: Operation::CompleteSubmission,
                phase: self.phase,
            });
        };
        self.phase = Phase::Completed;
        Ok(card)
    }

    fn compute_score(&self) -> ScoreCard {
        let correct = self
            .questions
            .iter()
            .filter(|q| q.is_answered_correctly(self.answers.get(&q.id())))
            .count();
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        let score = u32::try_from(correct).unwrap_or(total);
        ScoreCard::tally(score, total)
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.len())
            .field("current", &self.current)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("phase", &self.phase)
            .field("seed", &self.seed)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerKey;
    use crate::time::fixed_now;

    fn question(id: u64, answer: AnswerKey) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["a".into(), "b".into(), "c".into()],
            answer,
        )
        .unwrap()
    }

    /// Q1 single (1), Q2 single (0), Q3 multi {0, 2}.
    fn scenario_bank() -> Vec<Question> {
        vec![
            question(1, AnswerKey::Single(1)),
            question(2, AnswerKey::Single(0)),
            question(3, AnswerKey::Multi([0, 2].into_iter().collect())),
        ]
    }

    fn start(bank: Vec<Question>, secs: u32) -> ExamSession {
        ExamSession::start_with_seed(bank, secs, 11, fixed_now()).unwrap()
    }

    const Q1: QuestionId = QuestionId::new(1);
    const Q2: QuestionId = QuestionId::new(2);
    const Q3: QuestionId = QuestionId::new(3);

    #[test]
    fn start_rejects_empty_set() {
        let err = ExamSession::start(Vec::new(), 300, fixed_now()).unwrap_err();
        assert_eq!(err, ExamSessionError::EmptyQuestionSet);
    }

    #[test]
    fn start_rejects_zero_duration() {
        let err = ExamSession::start(scenario_bank(), 0, fixed_now()).unwrap_err();
        assert_eq!(err, ExamSessionError::ZeroDuration);
    }

    #[test]
    fn start_rejects_duplicate_ids() {
        let mut bank = scenario_bank();
        bank.push(question(2, AnswerKey::Single(2)));
        let err = ExamSession::start(bank, 300, fixed_now()).unwrap_err();
        assert_eq!(err, ExamSessionError::DuplicateQuestion(Q2));
    }

    #[test]
    fn fresh_session_state() {
        let session = start(scenario_bank(), 300);
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.remaining_seconds(), 300);
        assert_eq!(session.score_card(), None);
    }

    #[test]
    fn ordered_questions_are_a_permutation() {
        let bank: Vec<Question> = (1..=25).map(|id| question(id, AnswerKey::Single(0))).collect();
        let session = start(bank.clone(), 60);

        assert_eq!(session.total_questions(), bank.len());
        let mut ids: Vec<QuestionId> = session.questions().iter().map(Question::id).collect();
        ids.sort();
        let mut expected: Vec<QuestionId> = bank.iter().map(Question::id).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn seeded_sessions_share_order() {
        let a = ExamSession::start_with_seed(scenario_bank(), 10, 99, fixed_now()).unwrap();
        let b = ExamSession::start_with_seed(scenario_bank(), 10, 99, fixed_now()).unwrap();
        assert_eq!(a.questions(), b.questions());
        assert_eq!(a.seed(), 99);
    }

    #[test]
    fn scores_two_of_three() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q1, 1).unwrap();
        session.select_answer(Q2, 1).unwrap();
        session.select_answer(Q3, 0).unwrap();
        session.select_answer(Q3, 2).unwrap();

        let card = session.submit(fixed_now()).unwrap();
        assert_eq!((card.score(), card.total()), (2, 3));
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.submit_reason(), Some(SubmitReason::Manual));
    }

    #[test]
    fn multi_answer_order_does_not_matter() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q1, 1).unwrap();
        session.select_answer(Q2, 1).unwrap();
        session.select_answer(Q3, 2).unwrap();
        session.select_answer(Q3, 0).unwrap();

        let card = session.submit(fixed_now()).unwrap();
        assert_eq!(card.score(), 2);
    }

    #[test]
    fn multi_with_extra_option_scores_zero() {
        let mut session = start(scenario_bank(), 300);
        for option in [0, 1, 2] {
            session.select_answer(Q3, option).unwrap();
        }
        let card = session.submit(fixed_now()).unwrap();
        assert_eq!(card.score(), 0);
    }

    #[test]
    fn cleared_answer_scores_wrong() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q1, 1).unwrap();
        assert!(session.clear_answer(Q1).unwrap());
        assert!(!session.clear_answer(Q1).unwrap());

        let card = session.submit(fixed_now()).unwrap();
        assert_eq!(card.score(), 0);
    }

    #[test]
    fn empty_multi_key_is_won_by_leaving_it_blank() {
        let bank = vec![question(4, AnswerKey::Multi(Default::default()))];
        let mut session = start(bank, 300);
        let q4 = QuestionId::new(4);
        session.select_answer(q4, 0).unwrap();
        assert!(session.select_answer(q4, 0).unwrap().is_none());

        let card = session.submit(fixed_now()).unwrap();
        assert_eq!((card.score(), card.total()), (1, 1));
    }

    #[test]
    fn single_reselect_replaces() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q1, 0).unwrap();
        let selection = session.select_answer(Q1, 1).unwrap().cloned();
        assert_eq!(selection, Some(Selection::Single(1)));
        session.select_answer(Q1, 1).unwrap();
        assert_eq!(session.selection(Q1), Some(&Selection::Single(1)));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn multi_toggle_off_and_on() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q3, 2).unwrap();
        assert!(session.select_answer(Q3, 2).unwrap().is_none());
        assert!(!session.is_answered(Q3));
        assert_eq!(session.answered_count(), 0);

        session.select_answer(Q3, 2).unwrap();
        assert!(session.selection(Q3).is_some_and(|s| s.contains(2)));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn rejects_out_of_range_option_and_unknown_question() {
        let mut session = start(scenario_bank(), 300);
        let err = session.select_answer(Q1, 3).unwrap_err();
        assert_eq!(
            err,
            ExamSessionError::OutOfRangeSelection {
                question_id: Q1,
                option: 3,
                options: 3
            }
        );
        let stranger = QuestionId::new(404);
        assert_eq!(
            session.select_answer(stranger, 0).unwrap_err(),
            ExamSessionError::UnknownQuestion(stranger)
        );
        assert_eq!(
            session.clear_answer(stranger).unwrap_err(),
            ExamSessionError::UnknownQuestion(stranger)
        );
        assert_eq!(session.answered_count(), 0);
    }

    #[test]
    fn navigation_is_clamped() {
        let mut session = start(scenario_bank(), 300);
        assert_eq!(session.navigate(Direction::Previous).unwrap(), 0);
        assert_eq!(session.navigate(Direction::Next).unwrap(), 1);
        assert_eq!(session.navigate(Direction::Next).unwrap(), 2);
        assert_eq!(session.navigate(Direction::Next).unwrap(), 2);
        assert_eq!(session.go_to(0).unwrap(), 0);
        assert_eq!(
            session.go_to(3).unwrap_err(),
            ExamSessionError::OutOfRangeQuestion { index: 3, total: 3 }
        );
    }

    #[test]
    fn select_current_targets_shown_question() {
        let mut session = start(scenario_bank(), 300);
        session.navigate(Direction::Next).unwrap();
        let shown = session.current_question().id();
        session.select_current(0).unwrap();
        assert!(session.is_answered(shown));
    }

    #[test]
    fn answered_count_never_exceeds_total() {
        let mut session = start(scenario_bank(), 300);
        for id in [Q1, Q2, Q3] {
            for option in 0..3 {
                session.select_answer(id, option).unwrap();
                assert!(session.answered_count() <= session.total_questions());
            }
        }
        let progress = session.progress();
        assert_eq!(progress.answered + progress.unanswered, progress.total);
    }

    #[test]
    fn ticking_total_seconds_times_out_once() {
        let total = 5;
        let mut session = start(scenario_bank(), total);
        let mut timeouts = 0;
        for _ in 0..total {
            if let TickOutcome::TimedOut(_) = session.tick(fixed_now()).unwrap() {
                timeouts += 1;
            }
        }
        assert_eq!(timeouts, 1);
        assert_eq!(session.remaining_seconds(), 0);
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.submit_reason(), Some(SubmitReason::TimedOut));

        let err = session.tick(fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            ExamSessionError::InvalidTransition {
                operation: Operation::Tick,
                phase: Phase::Completed
            }
        ));
    }

    #[test]
    fn second_submit_is_rejected_and_score_unchanged() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q1, 1).unwrap();
        let first = session.submit(fixed_now()).unwrap();

        let err = session.submit(fixed_now()).unwrap_err();
        assert!(matches!(err, ExamSessionError::InvalidTransition { .. }));
        assert_eq!(session.score_card(), Some(first));
    }

    #[test]
    fn completed_session_is_frozen() {
        let mut session = start(scenario_bank(), 300);
        session.select_answer(Q1, 1).unwrap();
        session.tick(fixed_now()).unwrap();
        session.submit(fixed_now()).unwrap();

        assert!(session.select_answer(Q2, 0).is_err());
        assert!(session.clear_answer(Q1).is_err());
        assert!(session.navigate(Direction::Next).is_err());
        assert!(session.tick(fixed_now()).is_err());
        assert_eq!(session.remaining_seconds(), 299);
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn deferred_completion_holds_submitting() {
        let mut session = start(scenario_bank(), 300).with_deferred_completion(true);
        let card = session.submit(fixed_now()).unwrap();
        assert_eq!(session.phase(), Phase::Submitting);
        assert!(session.select_answer(Q1, 0).is_err());
        assert!(session.tick(fixed_now()).is_err());

        assert_eq!(session.complete_submission().unwrap(), card);
        assert_eq!(session.phase(), Phase::Completed);
        assert!(session.complete_submission().is_err());
    }

    #[test]
    fn complete_requires_submitting() {
        let mut session = start(scenario_bank(), 300);
        let err = session.complete_submission().unwrap_err();
        assert_eq!(
            err,
            ExamSessionError::InvalidTransition {
                operation: Operation::CompleteSubmission,
                phase: Phase::InProgress
            }
        );
    }
}
