//! Set of opaque uploader hashes whose uploads are silently suppressed
//! (spec §4.B, invariant 5). Additive only — removal is out of scope.

use sqlx::PgPool;

use crate::error::AppError;

pub struct Blacklist {
    pool: PgPool,
}

impl Blacklist {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn has(&self, uploader_hash: &str) -> Result<bool, AppError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM blacklisted_uploader WHERE uploader_hash = $1",
        )
        .bind(uploader_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    pub async fn add(&self, uploader_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO blacklisted_uploader (uploader_hash) VALUES ($1)
             ON CONFLICT (uploader_hash) DO NOTHING",
        )
        .bind(uploader_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
