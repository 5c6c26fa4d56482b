use std::sync::Arc;

use exam_core::model::Profile;
use storage::repository::ProfileRepository;
use tracing::debug;

use crate::error::ProfileServiceError;

/// Remembers the signed-in candidate between runs.
#[derive(Clone)]
pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(repo: Arc<dyn ProfileRepository>) -> Self {
        Self { repo }
    }

    /// The remembered profile, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError` on storage failures.
    pub async fn load(&self) -> Result<Option<Profile>, ProfileServiceError> {
        Ok(self.repo.get_profile().await?)
    }

    /// Validate and persist a profile. A missing name falls back to the username.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError` if the username is blank or persistence fails.
    pub async fn remember(
        &self,
        username: &str,
        name: Option<String>,
    ) -> Result<Profile, ProfileServiceError> {
        let profile = Profile::new(username, name)?;
        self.repo.save_profile(&profile).await?;
        debug!(username = profile.username(), "profile remembered");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError` on storage failures.
    pub async fn forget(&self) -> Result<(), ProfileServiceError> {
        self.repo.clear_profile().await?;
        Ok(())
    }
}
