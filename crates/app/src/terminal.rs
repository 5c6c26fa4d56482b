use std::fmt::Write as _;

use exam_core::model::{QuestionKind, SubmitReason};
use exam_core::{Direction, SessionProgress, TimerUrgency, format_countdown};
use services::{ExamHandle, ExamOutcome, ExamResultListItem, ExamServiceError, ExamSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    /// Zero-based option index.
    Toggle(usize),
    Next,
    Previous,
    /// Zero-based question index.
    GoTo(usize),
    Clear,
    Show,
    Submit,
    Quit,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();

    match (head.as_str(), arg) {
        ("", _) | ("show" | "s", None) => Input::Show,
        ("n" | "next", None) => Input::Next,
        ("p" | "prev" | "previous", None) => Input::Previous,
        ("g" | "goto", Some(raw)) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => Input::GoTo(n - 1),
            _ => Input::Unknown(line.to_owned()),
        },
        ("c" | "clear", None) => Input::Clear,
        ("submit", None) => Input::Submit,
        ("q" | "quit", None) => Input::Quit,
        ("h" | "help" | "?", None) => Input::Help,
        (raw, None) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => Input::Toggle(n - 1),
            _ => Input::Unknown(line.to_owned()),
        },
        _ => Input::Unknown(line.to_owned()),
    }
}

fn is_confirmation(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn submit_prompt(progress: SessionProgress) -> String {
    let mut prompt = format!(
        "You have answered {} out of {} questions.",
        progress.answered, progress.total
    );
    if progress.unanswered > 0 {
        let _ = write!(prompt, " {} will be marked wrong.", progress.unanswered);
    }
    prompt.push_str(" Submit now? [y/N]");
    prompt
}

/// Submit, or collect the timed-out outcome if the countdown got there first.
async fn submit_or_collect(handle: &ExamHandle) -> Result<ExamOutcome, ExamServiceError> {
    match handle.submit().await {
        Err(ExamServiceError::Session(err)) => {
            debug!(%err, "exam already submitted, waiting for its outcome");
            handle.wait_for_completion().await
        }
        other => other,
    }
}

const HELP: &str = "\
Commands:
  <number>     select (or toggle) that option
  n / p        next / previous question
  g <number>   go to question
  c            clear the answer to this question
  s            show the current question again
  submit       submit the exam (asks for confirmation)
  q            quit without submitting";

/// Drive an exam from stdin until it is submitted, times out or is abandoned.
///
/// Returns `None` when the candidate quits or stdin closes.
pub async fn run_exam(
    handle: ExamHandle,
) -> Result<Option<ExamOutcome>, Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut snapshots = handle.subscribe();
    let mut urgency = handle.snapshot().urgency;
    let mut confirming = false;

    println!("{HELP}");
    println!();
    println!("{}", render_question(&handle.snapshot()));

    loop {
        tokio::select! {
            biased;

            changed = snapshots.changed() => {
                changed.map_err(|_| ExamServiceError::ControllerGone)?;
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(outcome) = snapshot.outcome {
                    if outcome.reason == SubmitReason::TimedOut {
                        println!();
                        println!("Time is up! Your answers were submitted automatically.");
                    }
                    return Ok(Some(outcome));
                }
                if snapshot.urgency != urgency {
                    urgency = snapshot.urgency;
                    if let Some(notice) = urgency_notice(urgency, snapshot.remaining_seconds) {
                        println!("{notice}");
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    handle.abandon().await;
                    return Ok(None);
                };
                if std::mem::take(&mut confirming) {
                    if is_confirmation(&line) {
                        return Ok(Some(submit_or_collect(&handle).await?));
                    }
                    println!("Not submitted.");
                    println!("{}", render_question(&handle.snapshot()));
                    continue;
                }
                let input = parse_input(&line);
                let result = match input {
                    Input::Toggle(option) => handle.select_current(option).await.map(|_| ()),
                    Input::Next => handle.navigate(Direction::Next).await.map(|_| ()),
                    Input::Previous => handle.navigate(Direction::Previous).await.map(|_| ()),
                    Input::GoTo(index) => handle.go_to(index).await.map(|_| ()),
                    Input::Clear => {
                        let id = handle.snapshot().current_question.id();
                        handle.clear_answer(id).await.map(|_| ())
                    }
                    Input::Show => Ok(()),
                    Input::Submit => {
                        println!("{}", submit_prompt(handle.snapshot().progress));
                        confirming = true;
                        continue;
                    }
                    Input::Quit => {
                        handle.abandon().await;
                        return Ok(None);
                    }
                    Input::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    Input::Unknown(raw) => {
                        println!("Unrecognised input: {raw:?} (type h for help)");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("{}", render_question(&handle.snapshot())),
                    Err(ExamServiceError::Session(err)) => println!("{err}"),
                    Err(err) => return Err(err.into()),
                }
            }
        }
    }
}

fn urgency_notice(urgency: TimerUrgency, remaining: u32) -> Option<String> {
    match urgency {
        TimerUrgency::Normal => None,
        TimerUrgency::Warning => Some(format!("[{}] Less than two minutes left.", format_countdown(remaining))),
        TimerUrgency::Critical => Some(format!("[{}] Final minute!", format_countdown(remaining))),
    }
}

pub fn render_question(snapshot: &ExamSnapshot) -> String {
    let question = &snapshot.current_question;
    let progress = snapshot.progress;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Question {}/{}  [{}]  answered {}/{}",
        progress.current_index + 1,
        progress.total,
        snapshot.countdown(),
        progress.answered,
        progress.total,
    );
    let _ = writeln!(out, "{} ({})", question.prompt(), question.kind().label());
    for (index, option) in question.options().iter().enumerate() {
        let chosen = snapshot
            .current_selection
            .as_ref()
            .is_some_and(|selection| selection.contains(index));
        let marker = match (question.kind(), chosen) {
            (QuestionKind::Single, true) => "(*)",
            (QuestionKind::Single, false) => "( )",
            (QuestionKind::Multi, true) => "[x]",
            (QuestionKind::Multi, false) => "[ ]",
        };
        let _ = writeln!(out, "  {marker} {}. {option}", index + 1);
    }
    out.trim_end().to_owned()
}

pub fn render_outcome(candidate: &str, outcome: &ExamOutcome) -> String {
    let card = outcome.score_card;
    let mut out = String::new();

    let _ = writeln!(out, "OFFICIAL SCORE CARD");
    let _ = writeln!(out, "Candidate:  {candidate}");
    let _ = writeln!(out, "Date:       {}", outcome.completed_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "Score:      {} / {}", card.score(), card.total());
    let _ = writeln!(out, "GRADE: {}   ({}%)", card.grade(), card.rounded_percentage());
    let _ = writeln!(out, "Status:     {}", if card.passed() { "PASSED" } else { "FAILED" });
    let _ = writeln!(
        out,
        "Correct {}  Incorrect {}  Answered {}",
        card.score(),
        card.wrong(),
        outcome.answered
    );
    if card.passed() {
        let _ = writeln!(out, "Congratulations! You have successfully passed the examination.");
    } else {
        let _ = writeln!(out, "Keep learning! Review the material and try again.");
    }
    if outcome.result_id.is_none() {
        let _ = writeln!(out, "(the result could not be saved)");
    }
    out.trim_end().to_owned()
}

pub fn render_history(items: &[ExamResultListItem]) -> String {
    if items.is_empty() {
        return "No exam results yet.".to_owned();
    }
    let mut out = String::new();
    for item in items {
        let reason = match item.reason {
            SubmitReason::Manual => "",
            SubmitReason::TimedOut => "  (timed out)",
        };
        let _ = writeln!(
            out,
            "#{:<4} {}  {:<12} {:>3}/{:<3} {:>3}%  {:<2}  {}  {}s{reason}",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.candidate,
            item.score,
            item.total,
            item.percentage,
            item.grade,
            if item.passed { "PASS" } else { "FAIL" },
            item.elapsed_secs,
        );
    }
    out.trim_end().to_owned()
}
