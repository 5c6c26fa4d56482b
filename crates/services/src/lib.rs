#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod error;
pub mod exam;
pub mod profile_service;

pub use exam_core::Clock;

pub use app_services::{AppServices, ExamSettings};
pub use auth_service::{AuthConfig, AuthService, RegisteredUser};
pub use error::{AppServicesError, AuthError, ExamServiceError, ProfileServiceError};
pub use exam::{
    CountdownTimer, ExamController, ExamHandle, ExamOutcome, ExamResultListItem,
    ExamResultService, ExamSnapshot, ExamWorkflowService, RepositoryResultSink, ResultSink,
};
pub use profile_service::ProfileService;
