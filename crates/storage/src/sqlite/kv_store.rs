use sqlx::Row;

use crate::repository::StorageError;

use super::SqliteHost;

impl SqliteHost {
    /// Insert or overwrite one entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the write fails.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the query or column decoding fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.map(|row| {
            row.try_get::<String, _>("value")
                .map_err(|err| StorageError::Serialization(err.to_string()))
        })
        .transpose()
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the query or column decoding fails.
    pub async fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
        let rows = sqlx::query("SELECT key, value FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let key: String = row
                    .try_get("key")
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                let value: String = row
                    .try_get("value")
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                Ok((key, value))
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the delete fails.
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
