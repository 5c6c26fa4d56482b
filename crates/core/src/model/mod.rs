mod ids;
mod profile;
mod question;
mod result;
mod score;
mod selection;

pub use ids::{ParseIdError, QuestionId, ResultId};
pub use profile::{Profile, ProfileError};
pub use question::{AnswerKey, Question, QuestionDraft, QuestionError, QuestionKind, RawAnswer};
pub use result::{ExamResult, ExamResultError, SubmitReason};
pub use score::{LetterGrade, PASS_PERCENTAGE, ScoreBand, ScoreCard, ScoreCardError};
pub use selection::Selection;
