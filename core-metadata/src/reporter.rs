//! Invalid-date log
//!
//! Objects whose bibliographic record carries an unparseable date are noted
//! for operator follow-up. Reporting never affects the document build.

use async_trait::async_trait;
use core_storage::ObjectId;
use sqlx::SqlitePool;

use crate::error::Result;

#[async_trait]
pub trait InvalidDateReporter: Send + Sync {
    async fn report(&self, pid: &ObjectId) -> Result<()>;
}

/// Reporter that only keeps identifiers in an `invalid_dates` table
pub struct SqliteInvalidDateReporter {
    pool: SqlitePool,
}

impl SqliteInvalidDateReporter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invalid_dates (
                pid TEXT PRIMARY KEY,
                reported_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn reported(&self) -> Result<Vec<ObjectId>> {
        let pids: Vec<String> = sqlx::query_scalar("SELECT pid FROM invalid_dates ORDER BY pid")
            .fetch_all(&self.pool)
            .await?;
        Ok(pids.into_iter().map(ObjectId::from).collect())
    }
}

#[async_trait]
impl InvalidDateReporter for SqliteInvalidDateReporter {
    async fn report(&self, pid: &ObjectId) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO invalid_dates (pid, reported_at) VALUES (?, ?)")
            .bind(pid.as_str())
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
