use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("username cannot be empty")]
    EmptyUsername,
}

/// The remembered candidate, used to skip login on relaunch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    username: String,
    name: String,
}

impl Profile {
    /// Builds a profile; a missing or blank display name falls back to the username.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyUsername` if the username is blank.
    pub fn new(username: impl Into<String>, name: Option<String>) -> Result<Self, ProfileError> {
        let username = username.into().trim().to_owned();
        if username.is_empty() {
            return Err(ProfileError::EmptyUsername);
        }
        let name = name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| username.clone());
        Ok(Self { username, name })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_falls_back_to_username() {
        let profile = Profile::new("asha", Some("  ".into())).unwrap();
        assert_eq!(profile.name(), "asha");

        let profile = Profile::new(" asha ", Some("Asha K".into())).unwrap();
        assert_eq!(profile.username(), "asha");
        assert_eq!(profile.name(), "Asha K");
    }

    #[test]
    fn blank_username_is_rejected() {
        assert_eq!(Profile::new(" ", None), Err(ProfileError::EmptyUsername));
    }
}
