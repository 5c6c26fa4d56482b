use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use exam_core::model::{ExamResult, Question, QuestionId, ResultId, ScoreCard, Selection, SubmitReason};
use exam_core::{
    Clock, Direction, ExamSession, Phase, SessionProgress, TickOutcome, TimerUrgency,
    format_countdown,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::sink::ResultSink;
use super::timer::{CountdownTimer, TICK_PERIOD};
use crate::error::ExamServiceError;

type Reply<T> = oneshot::Sender<Result<T, ExamServiceError>>;

/// How a finished attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamOutcome {
    pub score_card: ScoreCard,
    pub reason: SubmitReason,
    pub answered: usize,
    pub completed_at: DateTime<Utc>,
    /// `None` when the result sink failed.
    pub result_id: Option<ResultId>,
}

/// Read-only view of a running session, republished after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSnapshot {
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub urgency: TimerUrgency,
    pub progress: SessionProgress,
    pub current_question: Question,
    pub current_selection: Option<Selection>,
    pub outcome: Option<ExamOutcome>,
}

impl ExamSnapshot {
    fn capture(session: &ExamSession, outcome: Option<ExamOutcome>) -> Self {
        let current_question = session.current_question().clone();
        let current_selection = session.selection(current_question.id()).cloned();
        Self {
            phase: session.phase(),
            remaining_seconds: session.remaining_seconds(),
            urgency: TimerUrgency::from_remaining(session.remaining_seconds()),
            progress: session.progress(),
            current_question,
            current_selection,
            outcome,
        }
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn countdown(&self) -> String {
        format_countdown(self.remaining_seconds)
    }
}

/// Requests handled by the controller task.
#[derive(Debug)]
pub enum ExamCommand {
    Select {
        question_id: QuestionId,
        option: usize,
        reply: Reply<Option<Selection>>,
    },
    SelectCurrent {
        option: usize,
        reply: Reply<Option<Selection>>,
    },
    Clear {
        question_id: QuestionId,
        reply: Reply<bool>,
    },
    Navigate {
        direction: Direction,
        reply: Reply<usize>,
    },
    GoTo {
        index: usize,
        reply: Reply<usize>,
    },
    Submit {
        reply: Reply<ExamOutcome>,
    },
    Abandon {
        reply: oneshot::Sender<()>,
    },
}

/// Owns an `ExamSession` inside a task and serializes ticks with user commands.
pub struct ExamController {
    session: ExamSession,
    candidate: String,
    sink: Arc<dyn ResultSink>,
    clock: Clock,
    timer: CountdownTimer,
    ticks: mpsc::Receiver<()>,
    commands: mpsc::Receiver<ExamCommand>,
    snapshots: watch::Sender<ExamSnapshot>,
    outcome: Option<ExamOutcome>,
}

impl ExamController {
    /// Start driving `session` with a one second countdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::EmptyCandidate` for a blank candidate name and
    /// `ExamServiceError::NotInProgress` if the session was already submitted.
    pub fn spawn(
        session: ExamSession,
        candidate: impl Into<String>,
        sink: Arc<dyn ResultSink>,
        clock: Clock,
    ) -> Result<ExamHandle, ExamServiceError> {
        Self::spawn_with_period(session, candidate, sink, clock, TICK_PERIOD)
    }

    /// Same as [`ExamController::spawn`] with a custom tick period.
    ///
    /// # Errors
    ///
    /// See [`ExamController::spawn`].
    pub fn spawn_with_period(
        session: ExamSession,
        candidate: impl Into<String>,
        sink: Arc<dyn ResultSink>,
        clock: Clock,
        period: Duration,
    ) -> Result<ExamHandle, ExamServiceError> {
        let candidate = candidate.into().trim().to_owned();
        if candidate.is_empty() {
            return Err(ExamServiceError::EmptyCandidate);
        }
        if session.phase() != Phase::InProgress {
            return Err(ExamServiceError::NotInProgress);
        }

        let session = session.with_deferred_completion(true);
        let (snapshot_tx, snapshot_rx) = watch::channel(ExamSnapshot::capture(&session, None));
        let (command_tx, command_rx) = mpsc::channel(16);
        let (timer, ticks) = CountdownTimer::start(period);

        let controller = Self {
            session,
            candidate,
            sink,
            clock,
            timer,
            ticks,
            commands: command_rx,
            snapshots: snapshot_tx,
            outcome: None,
        };
        let task = tokio::spawn(controller.run());

        Ok(ExamHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            task,
        })
    }

    async fn run(mut self) {
        info!(
            candidate = %self.candidate,
            questions = self.session.total_questions(),
            seconds = self.session.total_seconds(),
            seed = self.session.seed(),
            "exam started"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("exam handle dropped");
                        break;
                    };
                    if !self.handle(command).await {
                        break;
                    }
                }
                tick = self.ticks.recv(), if !self.timer.is_cancelled() => {
                    match tick {
                        Some(()) => self.on_tick().await,
                        None => self.timer.cancel(),
                    }
                }
            }
        }

        self.timer.cancel();
    }

    /// Returns `false` once the controller should stop.
    ///
    /// Every reply is sent after the new snapshot is published.
    async fn handle(&mut self, command: ExamCommand) -> bool {
        match command {
            ExamCommand::Select {
                question_id,
                option,
                reply,
            } => {
                let result = self
                    .session
                    .select_answer(question_id, option)
                    .map(|selection| selection.cloned())
                    .map_err(ExamServiceError::from);
                self.respond(reply, result);
            }
            ExamCommand::SelectCurrent { option, reply } => {
                let result = self
                    .session
                    .select_current(option)
                    .map(|selection| selection.cloned())
                    .map_err(ExamServiceError::from);
                self.respond(reply, result);
            }
            ExamCommand::Clear { question_id, reply } => {
                let result = self.session.clear_answer(question_id).map_err(Into::into);
                self.respond(reply, result);
            }
            ExamCommand::Navigate { direction, reply } => {
                let result = self.session.navigate(direction).map_err(Into::into);
                self.respond(reply, result);
            }
            ExamCommand::GoTo { index, reply } => {
                let result = self.session.go_to(index).map_err(Into::into);
                self.respond(reply, result);
            }
            ExamCommand::Submit { reply } => {
                let result = self.submit_manual().await;
                self.respond(reply, result);
            }
            ExamCommand::Abandon { reply } => {
                info!(candidate = %self.candidate, "exam abandoned");
                self.timer.cancel();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn respond<T>(&self, reply: Reply<T>, result: Result<T, ExamServiceError>) {
        self.publish();
        let _ = reply.send(result);
    }

    async fn on_tick(&mut self) {
        let now = self.clock.now();
        match self.session.tick(now) {
            Ok(TickOutcome::Running { remaining }) => debug!(remaining, "tick"),
            Ok(TickOutcome::TimedOut(score_card)) => {
                info!(
                    candidate = %self.candidate,
                    score = score_card.score(),
                    total = score_card.total(),
                    "time is up, exam submitted"
                );
                self.finish(score_card).await;
            }
            Err(err) => {
                warn!(%err, "tick ignored");
                self.timer.cancel();
            }
        }
        self.publish();
    }

    async fn submit_manual(&mut self) -> Result<ExamOutcome, ExamServiceError> {
        let score_card = self.session.submit(self.clock.now())?;
        info!(
            candidate = %self.candidate,
            score = score_card.score(),
            total = score_card.total(),
            remaining = self.session.remaining_seconds(),
            "exam submitted"
        );
        Ok(self.finish(score_card).await)
    }

    /// Hand the frozen score to the sink, then complete the session.
    async fn finish(&mut self, score_card: ScoreCard) -> ExamOutcome {
        self.timer.cancel();
        self.publish();

        let reason = self.session.submit_reason().unwrap_or(SubmitReason::Manual);
        let completed_at = self.session.completed_at().unwrap_or_else(|| self.clock.now());
        let result_id = match self.build_result(score_card, reason, completed_at) {
            Ok(result) => match self.sink.record(&result).await {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(%err, "failed to record exam result");
                    None
                }
            },
            Err(err) => {
                warn!(%err, "exam result rejected");
                None
            }
        };

        if let Err(err) = self.session.complete_submission() {
            warn!(%err, "exam completion out of order");
        }

        let outcome = ExamOutcome {
            score_card,
            reason,
            answered: self.session.answered_count(),
            completed_at,
            result_id,
        };
        self.outcome = Some(outcome);
        outcome
    }

    fn build_result(
        &self,
        score_card: ScoreCard,
        reason: SubmitReason,
        completed_at: DateTime<Utc>,
    ) -> Result<ExamResult, ExamServiceError> {
        let answered = u32::try_from(self.session.answered_count()).unwrap_or(u32::MAX);
        Ok(ExamResult::new(
            self.candidate.clone(),
            score_card,
            answered,
            self.session.started_at(),
            completed_at,
            reason,
        )?)
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(ExamSnapshot::capture(&self.session, self.outcome));
    }
}

/// Caller side of a running exam.
///
/// Dropping the handle stops the controller and its timer without recording a
/// result.
#[derive(Debug)]
pub struct ExamHandle {
    commands: mpsc::Sender<ExamCommand>,
    snapshots: watch::Receiver<ExamSnapshot>,
    task: JoinHandle<()>,
}

impl ExamHandle {
    #[must_use]
    pub fn snapshot(&self) -> ExamSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExamSnapshot> {
        self.snapshots.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> ExamCommand,
    ) -> Result<T, ExamServiceError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ExamServiceError::ControllerGone)?;
        response.await.map_err(|_| ExamServiceError::ControllerGone)?
    }

    /// Toggle or set an option on `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Session` for rejected selections and
    /// `ControllerGone` if the controller stopped.
    pub async fn select_answer(
        &self,
        question_id: QuestionId,
        option: usize,
    ) -> Result<Option<Selection>, ExamServiceError> {
        self.request(|reply| ExamCommand::Select {
            question_id,
            option,
            reply,
        })
        .await
    }

    /// Toggle or set an option on the question currently shown.
    ///
    /// # Errors
    ///
    /// See [`ExamHandle::select_answer`].
    pub async fn select_current(&self, option: usize) -> Result<Option<Selection>, ExamServiceError> {
        self.request(|reply| ExamCommand::SelectCurrent { option, reply })
            .await
    }

    /// # Errors
    ///
    /// See [`ExamHandle::select_answer`].
    pub async fn clear_answer(&self, question_id: QuestionId) -> Result<bool, ExamServiceError> {
        self.request(|reply| ExamCommand::Clear { question_id, reply })
            .await
    }

    /// # Errors
    ///
    /// See [`ExamHandle::select_answer`].
    pub async fn navigate(&self, direction: Direction) -> Result<usize, ExamServiceError> {
        self.request(|reply| ExamCommand::Navigate { direction, reply })
            .await
    }

    /// # Errors
    ///
    /// See [`ExamHandle::select_answer`].
    pub async fn go_to(&self, index: usize) -> Result<usize, ExamServiceError> {
        self.request(|reply| ExamCommand::GoTo { index, reply }).await
    }

    /// Submit now and wait until the result has been handed to the sink.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Session` if the exam was already submitted.
    pub async fn submit(&self) -> Result<ExamOutcome, ExamServiceError> {
        self.request(|reply| ExamCommand::Submit { reply }).await
    }

    /// Wait until the exam completes, by submission or timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::ControllerGone` if the controller stopped first.
    pub async fn wait_for_completion(&self) -> Result<ExamOutcome, ExamServiceError> {
        let mut snapshots = self.snapshots.clone();
        loop {
            let outcome = snapshots.borrow_and_update().outcome;
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
            snapshots
                .changed()
                .await
                .map_err(|_| ExamServiceError::ControllerGone)?;
        }
    }

    /// Stop the exam without recording a result and wait for the task to exit.
    pub async fn abandon(self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(ExamCommand::Abandon { reply }).await.is_ok() {
            let _ = done.await;
        }
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::AnswerKey;
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::StorageError;

    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        recorded: Mutex<Vec<ExamResult>>,
        fail: bool,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn record(&self, result: &ExamResult) -> Result<ResultId, StorageError> {
            if self.fail {
                return Err(StorageError::Connection("offline".into()));
            }
            let mut recorded = self.recorded.lock().unwrap();
            recorded.push(result.clone());
            Ok(ResultId::new(i64::try_from(recorded.len()).unwrap()))
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::new(
                QuestionId::new(1),
                "Pick A",
                vec!["A".into(), "B".into()],
                AnswerKey::Single(0),
            )
            .unwrap(),
            Question::new(
                QuestionId::new(2),
                "Pick both",
                vec!["A".into(), "B".into(), "C".into()],
                AnswerKey::Multi([0, 1].into_iter().collect()),
            )
            .unwrap(),
        ]
    }

    fn session(seconds: u32) -> ExamSession {
        ExamSession::start_with_seed(questions(), seconds, 7, fixed_now()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_records_once() {
        let sink = Arc::new(RecordingSink::default());
        let handle = ExamController::spawn(session(3), "Asha", sink.clone(), fixed_clock()).unwrap();

        handle.select_answer(QuestionId::new(1), 0).await.unwrap();
        let outcome = handle.wait_for_completion().await.unwrap();

        assert_eq!(outcome.reason, SubmitReason::TimedOut);
        assert_eq!(outcome.score_card.score(), 1);
        assert_eq!(outcome.result_id, Some(ResultId::new(1)));

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, Phase::Completed);
        assert_eq!(snapshot.remaining_seconds, 0);

        let err = handle.submit().await.unwrap_err();
        assert!(matches!(err, ExamServiceError::Session(_)));
        assert_eq!(sink.recorded.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_countdown() {
        let sink = Arc::new(RecordingSink::default());
        let handle = ExamController::spawn(session(60), "Asha", sink.clone(), fixed_clock()).unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let outcome = handle.submit().await.unwrap();
        assert_eq!(outcome.reason, SubmitReason::Manual);

        let remaining = handle.snapshot().remaining_seconds;
        assert_eq!(remaining, 58);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.snapshot().remaining_seconds, remaining);
        assert_eq!(sink.recorded.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failure_still_completes() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let handle = ExamController::spawn(session(10), "Asha", sink, fixed_clock()).unwrap();

        let outcome = handle.submit().await.unwrap();
        assert_eq!(outcome.result_id, None);
        assert_eq!(handle.snapshot().phase, Phase::Completed);
        assert_eq!(handle.snapshot().remaining_seconds, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_forwarded_to_the_session() {
        let sink = Arc::new(RecordingSink::default());
        let handle = ExamController::spawn(session(30), "Asha", sink, fixed_clock()).unwrap();

        assert_eq!(handle.navigate(Direction::Previous).await.unwrap(), 0);
        assert_eq!(handle.go_to(1).await.unwrap(), 1);
        assert!(handle.go_to(5).await.is_err());

        let current = handle.snapshot().current_question;
        let selection = handle.select_current(0).await.unwrap();
        assert!(selection.is_some());
        assert_eq!(handle.snapshot().progress.answered, 1);

        assert!(handle.clear_answer(current.id()).await.unwrap());
        assert_eq!(handle.snapshot().progress.answered, 0);
        assert!(handle.snapshot().current_selection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_records_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let handle = ExamController::spawn(session(5), "Asha", sink.clone(), fixed_clock()).unwrap();
        let mut snapshots = handle.subscribe();

        handle.abandon().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(snapshots.changed().await.is_err());
        assert_eq!(snapshots.borrow().phase, Phase::InProgress);
        assert!(sink.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_blank_candidate() {
        let sink = Arc::new(RecordingSink::default());
        let err = ExamController::spawn(session(5), "  ", sink, fixed_clock()).unwrap_err();
        assert!(matches!(err, ExamServiceError::EmptyCandidate));
    }
}
