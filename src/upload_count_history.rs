//! Singleton rolling 30-day upload counter (spec §4.G).

use chrono::Utc;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::UploadCountHistory;

const SINGLETON_ID: i32 = 1;

pub struct UploadCountHistoryStore {
    pool: PgPool,
}

impl UploadCountHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the record verbatim, defaulting to a fresh singleton if the
    /// row has never been written.
    pub async fn retrieve(&self) -> Result<UploadCountHistory, AppError> {
        let row: Option<(chrono::DateTime<Utc>, serde_json::Value)> =
            sqlx::query_as("SELECT last_push, counts FROM upload_count_history WHERE id = $1")
                .bind(SINGLETON_ID)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((last_push, counts_json)) => {
                let counts: Vec<i64> =
                    serde_json::from_value(counts_json).map_err(|e| AppError::Durable(e.to_string()))?;
                Ok(UploadCountHistory { last_push, counts })
            }
            None => Ok(UploadCountHistory::default()),
        }
    }

    /// Applies one upload's worth of the rollover/increment rule and
    /// persists the result.
    pub async fn record_upload(&self) -> Result<UploadCountHistory, AppError> {
        let mut history = self.retrieve().await?;
        history.record_upload(Utc::now());

        let counts_json =
            serde_json::to_value(&history.counts).map_err(|e| AppError::Durable(e.to_string()))?;

        sqlx::query(
            "INSERT INTO upload_count_history (id, last_push, counts) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET last_push = EXCLUDED.last_push, counts = EXCLUDED.counts",
        )
        .bind(SINGLETON_ID)
        .bind(history.last_push)
        .bind(counts_json)
        .execute(&self.pool)
        .await?;

        Ok(history)
    }
}
