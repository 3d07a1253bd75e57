//! Resource-type defaults
//!
//! An operator-maintained table can pin the resource type of individual
//! objects; otherwise the bibliographic type-of-resource is mapped through a
//! fixed vocabulary.

use async_trait::async_trait;
use core_storage::ObjectId;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

/// Bibliographic type-of-resource value to resource-type facet
const VOCABULARY: &[(&str, &str)] = &[
    ("text", "text_resources"),
    ("cartographic", "maps"),
    ("notated music", "musical_scores"),
    ("sound recording", "audio_recordings"),
    ("sound recording-musical", "audio_recordings_musical"),
    ("sound recording-nonmusical", "audio_recordings_nonmusical"),
    ("still image", "images"),
    ("moving image", "moving_images"),
    ("three dimensional object", "realia"),
    ("software, multimedia", "software_multimedia"),
    ("mixed material", "mixed_materials"),
];

/// Facet for a type-of-resource value, if it belongs to the vocabulary.
///
/// Facet values themselves are accepted and map to themselves.
pub fn vocabulary_value(type_of_resource: &str) -> Option<&'static str> {
    let value = type_of_resource.trim().to_lowercase();
    VOCABULARY
        .iter()
        .find(|(source, facet)| *source == value || *facet == value)
        .map(|(_, facet)| *facet)
}

/// Per-object resource-type overrides
#[async_trait]
pub trait ResourceTypeOverrides: Send + Sync {
    async fn lookup(&self, pid: &ObjectId) -> Result<Option<String>>;
}

/// No overrides configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

#[async_trait]
impl ResourceTypeOverrides for NoOverrides {
    async fn lookup(&self, _pid: &ObjectId) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Override table `resource_types(pid, resource_type)` in SQLite
pub struct SqliteResourceTypes {
    pool: SqlitePool,
}

impl SqliteResourceTypes {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the table if it is missing
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS resource_types (pid TEXT NOT NULL UNIQUE, resource_type TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert(&self, pid: &ObjectId, resource_type: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO resource_types (pid, resource_type) VALUES (?, ?)")
            .bind(pid.as_str())
            .bind(resource_type)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceTypeOverrides for SqliteResourceTypes {
    async fn lookup(&self, pid: &ObjectId) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT resource_type FROM resource_types WHERE pid = ?")
                .bind(pid.as_str())
                .fetch_optional(&self.pool)
                .await?;
        if let Some(resource_type) = &value {
            debug!(pid = %pid, resource_type = %resource_type, "Resource type override");
        }
        Ok(value.filter(|v| !v.trim().is_empty()))
    }
}
