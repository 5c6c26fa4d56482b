use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::{AuthConfig, AuthService};
use crate::error::AppServicesError;
use crate::exam::{ExamResultService, ExamWorkflowService};
use crate::profile_service::ProfileService;

/// Runtime knobs shared by the exam services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamSettings {
    pub exam_seconds: u32,
    pub seed: Option<u64>,
    pub auth: AuthConfig,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            exam_seconds: exam_core::time::DEFAULT_EXAM_SECONDS,
            seed: None,
            auth: AuthConfig::default(),
        }
    }
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    workflow: Arc<ExamWorkflowService>,
    results: Arc<ExamResultService>,
    profiles: Arc<ProfileService>,
    auth: Arc<AuthService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ExamSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, settings: ExamSettings) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: ExamSettings) -> Self {
        let workflow = ExamWorkflowService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.results),
        )
        .with_exam_seconds(settings.exam_seconds)
        .with_seed(settings.seed);
        let results = ExamResultService::new(Arc::clone(&storage.results));
        let profiles = ProfileService::new(Arc::clone(&storage.profile));
        let auth = AuthService::new(settings.auth, profiles.clone());

        Self {
            workflow: Arc::new(workflow),
            results: Arc::new(results),
            profiles: Arc::new(profiles),
            auth: Arc::new(auth),
        }
    }

    #[must_use]
    pub fn workflow(&self) -> Arc<ExamWorkflowService> {
        Arc::clone(&self.workflow)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ExamResultService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }
}
