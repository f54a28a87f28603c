//! TrustedSourceRegistry: maps an API-key hash to an authorized uploading
//! client and tracks its cumulative upload count.
//!
//! A thin wrapper around a connection pool with hashed-secret lookups,
//! keyed by SHA-512 of an API key rather than a password hash, and with no
//! notion of a user account — this registry never stores plaintext keys.

use sha2::{Digest, Sha512};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::TrustedSource;

pub struct TrustedSourceRegistry {
    pool: PgPool,
}

impl TrustedSourceRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn hash_api_key(api_key_plaintext: &str) -> String {
        let digest = Sha512::digest(api_key_plaintext.as_bytes());
        hex::encode(digest)
    }

    /// Looks up a trusted source by plaintext API key. Never stores or logs
    /// the plaintext; only its SHA-512 touches the database.
    pub async fn get(&self, api_key_plaintext: &str) -> Result<Option<TrustedSource>, AppError> {
        let hash = Self::hash_api_key(api_key_plaintext);

        let row: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT api_key_sha512, name, upload_count FROM trusted_source WHERE api_key_sha512 = $1",
        )
        .bind(&hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(api_key_sha512, name, upload_count)| TrustedSource {
            api_key_sha512,
            name,
            upload_count,
        }))
    }

    /// Atomic `+1` on `upload_count`, at the SQL level rather than
    /// read-modify-write, so that `k` concurrent increments on the same key
    /// leave `upload_count` exactly `initial + k` (spec testable property 5).
    pub async fn increment(&self, api_key_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE trusted_source SET upload_count = upload_count + 1 WHERE api_key_sha512 = $1",
        )
        .bind(api_key_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_api_key_is_deterministic_and_never_plaintext() {
        let hash = TrustedSourceRegistry::hash_api_key("my-secret-key");
        assert_eq!(hash.len(), 128, "sha512 hex digest is 128 chars");
        assert_ne!(hash, "my-secret-key");
        assert_eq!(hash, TrustedSourceRegistry::hash_api_key("my-secret-key"));
    }
}
