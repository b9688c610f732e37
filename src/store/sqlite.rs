use super::ResourceStore;
use crate::error::StoreError;
use crate::model::ResourceMetadata;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::path::Path;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS resources (
    id         TEXT PRIMARY KEY,
    metadata   TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS artifacts (
    resource_id       TEXT PRIMARY KEY REFERENCES resources(id),
    representation_id TEXT,
    payload           TEXT NOT NULL,
    fetched_at        TEXT NOT NULL
);
";

/// Sqlite-backed resource store. Metadata is kept as a JSON column; fetched
/// artifact payloads live in a sibling table keyed by resource id, so a
/// re-fetch overwrites the previous payload.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Returns the stored payload for a resource, if it was fetched.
    pub async fn payload(&self, resource_id: Uuid) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT payload FROM artifacts WHERE resource_id = ?1")
            .bind(resource_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(row.map(|r| r.get::<String, _>("payload")))
    }

    async fn metadata(&self, resource_id: Uuid) -> Result<Option<ResourceMetadata>, StoreError> {
        let row = sqlx::query("SELECT metadata FROM resources WHERE id = ?1")
            .bind(resource_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        row.map(|r| {
            serde_json::from_str(&r.get::<String, _>("metadata"))
                .map_err(|e| StoreError::Persistence(format!("stored metadata is corrupt: {e}")))
        })
        .transpose()
    }
}

#[async_trait]
impl ResourceStore for SqliteStore {
    async fn exists(&self, resource_id: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM resources WHERE id = ?1")
            .bind(resource_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn save_metadata(&self, metadata: &ResourceMetadata) -> Result<Uuid, StoreError> {
        let resource_id = Uuid::new_v4();
        let document = serde_json::to_string(metadata)
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        sqlx::query("INSERT INTO resources (id, metadata, created_at) VALUES (?1, ?2, ?3)")
            .bind(resource_id.to_string())
            .bind(document)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(resource_id)
    }

    async fn save_data(&self, resource_id: Uuid, payload: &str) -> Result<(), StoreError> {
        let metadata = self
            .metadata(resource_id)
            .await?
            .ok_or(StoreError::NotFound(resource_id))?;

        // The record may carry several representations; the payload is filed
        // under the first one in key order. See DESIGN.md.
        let representation_id = metadata
            .representations
            .keys()
            .next()
            .map(Uuid::to_string);

        sqlx::query(
            "INSERT INTO artifacts (resource_id, representation_id, payload, fetched_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(resource_id) DO UPDATE
             SET representation_id = excluded.representation_id,
                 payload = excluded.payload,
                 fetched_at = excluded.fetched_at",
        )
        .bind(resource_id.to_string())
        .bind(representation_id)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }
}
