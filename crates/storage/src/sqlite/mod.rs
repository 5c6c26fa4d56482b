use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    ExamResultRepository, ProfileRepository, QuestionBankRepository, Storage,
};

mod exam_result_repo;
mod mapping;
mod migrate;
mod profile_repo;
mod question_repo;

/// One exam runs at a time, so a small pool covers the import and the
/// result write racing each other.
const POOL_SIZE: u32 = 4;
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Question bank, profile and result tables behind one `SQLite` pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Parse `database_url` into connection options for the exam database.
///
/// The file is created on first use, runs in WAL mode and waits up to
/// `LOCK_WAIT` on a locked database instead of failing at once.
///
/// # Errors
///
/// Returns `SqliteInitError` if the URL is not a valid `SQLite` URL.
pub fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, SqliteInitError> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(LOCK_WAIT))
}

impl SqliteRepository {
    /// Open a pool on `database_url`. Tables are not touched until
    /// [`SqliteRepository::migrate`] runs.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or no connection can
    /// be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(POOL_SIZE)
            .acquire_timeout(LOCK_WAIT)
            .connect_with(connect_options(database_url)?)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema versions. Safe to call on every start.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` whose three repositories share one migrated
    /// `SQLite` pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let questions: Arc<dyn QuestionBankRepository> = Arc::new(repo.clone());
        let profile: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo);
        Ok(Self {
            questions,
            profile,
            results,
        })
    }
}
