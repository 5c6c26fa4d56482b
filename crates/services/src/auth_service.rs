use std::env;

use exam_core::model::Profile;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AuthError;
use crate::profile_service::ProfileService;

pub const DEFAULT_API_URL: &str = "http://10.0.2.2:5000";

const LOGIN_FAILED: &str = "Invalid credentials";
const REGISTER_FAILED: &str = "Could not register for exam";
const USERS_FAILED: &str = "Could not load registered users";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    pub base_url: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Reads `EXAM_API_URL`, falling back to [`DEFAULT_API_URL`].
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("EXAM_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());
        Self::new(base_url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// A candidate registered for the exam.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Login and exam registration against the exam server.
#[derive(Clone)]
pub struct AuthService {
    client: Client,
    config: AuthConfig,
    profiles: ProfileService,
}

impl AuthService {
    #[must_use]
    pub fn new(config: AuthConfig, profiles: ProfileService) -> Self {
        Self {
            client: Client::new(),
            config,
            profiles,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Check credentials and remember the candidate on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` when the server refuses the credentials,
    /// `AuthError::Http` when it cannot be reached.
    pub async fn login(&self, username: &str, password: &str) -> Result<Profile, AuthError> {
        let username = username.trim();
        let response = self
            .client
            .post(self.config.endpoint("login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let body = read_body(response).await?;
        let name = accept(body, LOGIN_FAILED)?.name;

        let profile = self.profiles.remember(username, name).await?;
        info!(username = profile.username(), "logged in");
        Ok(profile)
    }

    /// Register `username` for the exam. Returns the server's confirmation.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the server's message if registration
    /// is refused.
    pub async fn register(&self, username: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(self.config.endpoint("exam/register"))
            .json(&RegisterRequest {
                username: username.trim(),
            })
            .send()
            .await?;
        let body = read_body(response).await?;
        let message = accept(body, REGISTER_FAILED)?.message.unwrap_or_default();
        info!(username = username.trim(), "registered for exam");
        Ok(message)
    }

    /// # Errors
    ///
    /// Returns `AuthError` if the list cannot be fetched.
    pub async fn registered_users(&self) -> Result<Vec<RegisteredUser>, AuthError> {
        let response = self
            .client
            .get(self.config.endpoint("exam/registered-users"))
            .send()
            .await?;
        let body = read_body(response).await?;
        let users = accept(body, USERS_FAILED)?.users.unwrap_or_default();
        debug!(count = users.len(), "registered users fetched");
        Ok(users)
    }

    /// # Errors
    ///
    /// Returns `AuthError` if the list cannot be fetched.
    pub async fn is_registered(&self, username: &str) -> Result<bool, AuthError> {
        let users = self.registered_users().await?;
        Ok(contains_user(&users, username))
    }
}

fn contains_user(users: &[RegisteredUser], username: &str) -> bool {
    let username = username.trim();
    users.iter().any(|user| user.username == username)
}

/// Decode a JSON body. Non-success statuses still carry `{success, message}`
/// from the exam server, so the status only matters when the body is unreadable.
async fn read_body(response: Response) -> Result<AuthResponse, AuthError> {
    let status = response.status();
    let raw = response.text().await?;
    match serde_json::from_str(&raw) {
        Ok(body) => Ok(body),
        Err(_) if !status.is_success() => Err(AuthError::HttpStatus(status)),
        Err(err) => Err(AuthError::Decode(err)),
    }
}

fn accept(body: AuthResponse, fallback: &str) -> Result<AuthResponse, AuthError> {
    if body.success {
        return Ok(body);
    }
    let message = body
        .message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned());
    Err(AuthError::Rejected(message))
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    users: Option<Vec<RegisteredUser>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> AuthResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn failed_login_uses_default_message() {
        let err = accept(parse(r#"{"success": false}"#), LOGIN_FAILED).unwrap_err();
        assert!(matches!(err, AuthError::Rejected(ref m) if m == "Invalid credentials"));

        let err = accept(
            parse(r#"{"success": false, "message": "Account locked"}"#),
            LOGIN_FAILED,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Account locked");
    }

    #[test]
    fn successful_login_carries_optional_name() {
        let body = accept(parse(r#"{"success": true, "name": "Asha R"}"#), LOGIN_FAILED).unwrap();
        assert_eq!(body.name.as_deref(), Some("Asha R"));

        let body = accept(parse(r#"{"success": true}"#), LOGIN_FAILED).unwrap();
        assert!(body.name.is_none());
    }

    #[test]
    fn registered_users_are_matched_by_username() {
        let body = accept(
            parse(r#"{"success": true, "users": [{"username": "asha"}, {"username": "ravi", "name": "Ravi"}]}"#),
            USERS_FAILED,
        )
        .unwrap();
        let users = body.users.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name.as_deref(), Some("Ravi"));
        assert!(contains_user(&users, " asha"));
        assert!(!contains_user(&users, "meera"));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = AuthConfig::new("http://localhost:5000/");
        assert_eq!(config.endpoint("login"), "http://localhost:5000/login");
        assert_eq!(AuthConfig::default().endpoint("exam/register"), "http://10.0.2.2:5000/exam/register");
    }
}
