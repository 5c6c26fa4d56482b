use async_trait::async_trait;
use exam_core::model::Profile;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{ProfileRepository, StorageError};

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query("SELECT username, name FROM profile WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let username: String = row.try_get("username").map_err(ser)?;
        let name: String = row.try_get("name").map_err(ser)?;
        Profile::new(username, Some(name)).map(Some).map_err(ser)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profile (id, username, name)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                name = excluded.name
            ",
        )
        .bind(profile.username())
        .bind(profile.name())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_profile(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM profile WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
