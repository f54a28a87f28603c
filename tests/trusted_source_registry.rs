//! DB-backed `TrustedSourceRegistry`: hashed lookup and atomic increment
//! (spec §8 property 5 — `k` concurrent increments leave the count exactly
//! `initial + k`).

use sqlx::PgPool;

use marketboard_backend::auth::TrustedSourceRegistry;

#[sqlx::test]
async fn unknown_api_key_returns_none(pool: PgPool) {
    let registry = TrustedSourceRegistry::new(pool);
    assert!(registry.get("nope").await.unwrap().is_none());
}

#[sqlx::test]
async fn get_never_sees_plaintext_key_in_storage(pool: PgPool) {
    let hash = TrustedSourceRegistry::hash_api_key("my-key");
    sqlx::query("INSERT INTO trusted_source (api_key_sha512, name, upload_count) VALUES ($1, $2, 0)")
        .bind(&hash)
        .bind("Teamcraft")
        .execute(&pool)
        .await
        .unwrap();

    let registry = TrustedSourceRegistry::new(pool);
    let source = registry.get("my-key").await.unwrap().unwrap();
    assert_eq!(source.name, "Teamcraft");
    assert_eq!(source.upload_count, 0);
}

#[sqlx::test]
async fn concurrent_increments_land_exactly_k_higher(pool: PgPool) {
    let hash = TrustedSourceRegistry::hash_api_key("my-key");
    sqlx::query("INSERT INTO trusted_source (api_key_sha512, name, upload_count) VALUES ($1, $2, 10)")
        .bind(&hash)
        .bind("Teamcraft")
        .execute(&pool)
        .await
        .unwrap();

    let registry = std::sync::Arc::new(TrustedSourceRegistry::new(pool.clone()));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let hash = hash.clone();
        handles.push(tokio::spawn(async move {
            registry.increment(&hash).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let source = registry.get("my-key").await.unwrap().unwrap();
    assert_eq!(source.upload_count, 18);
}
