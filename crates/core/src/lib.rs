#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod session;
pub mod shuffle;
pub mod time;

pub use error::Error;
pub use session::{
    Direction, ExamSession, ExamSessionError, Operation, Phase, SessionProgress, TickOutcome,
};
pub use time::{Clock, TimerUrgency, format_countdown};
