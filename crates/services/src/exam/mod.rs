//! Timed exam flow: workflow, controller actor, countdown timer and results.

pub mod controller;
pub mod sink;
pub mod timer;
pub mod view;
pub mod workflow;

pub use controller::{ExamCommand, ExamController, ExamHandle, ExamOutcome, ExamSnapshot};
pub use sink::{RepositoryResultSink, ResultSink};
pub use timer::{CountdownTimer, TICK_PERIOD};
pub use view::{ExamResultListItem, ExamResultService};
pub use workflow::ExamWorkflowService;
