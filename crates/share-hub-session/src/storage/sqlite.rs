//! SQLite durable store (feature-gated).

use std::{collections::BTreeMap, str::FromStr};

use async_trait::async_trait;
use serde_json::Value;
use share_hub_core::{KeyValueStore, StorageError};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS share_state (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
)";

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// SQLite storage implementation.
///
/// Every actor namespace shares one table; rows are keyed by
/// `(namespace, key)` and values are stored as JSON text.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Open (creating if needed) the database at `database_url`.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(backend)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(backend)?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the table if it is missing.
    ///
    /// # Errors
    /// Returns error if the schema cannot be created.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(SCHEMA).execute(&pool).await.map_err(backend)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn list(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM share_state WHERE namespace = ?")
                .bind(namespace)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        rows.into_iter()
            .map(|(key, value)| -> Result<(String, Value), StorageError> {
                Ok((key, serde_json::from_str(&value)?))
            })
            .collect()
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM share_state WHERE namespace = ? AND key = ?")
                .bind(namespace)
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.map(|(value,)| serde_json::from_str(&value))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO share_state (namespace, key, value) VALUES (?, ?, ?)
             ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
        )
        .bind(namespace)
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM share_state WHERE namespace = ?")
            .bind(namespace)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
