//! DB-backed `Blacklist`: additive membership (spec §4.B invariant 5).

use sqlx::PgPool;

use marketboard_backend::blacklist::Blacklist;

#[sqlx::test]
async fn unlisted_hash_is_not_blacklisted(pool: PgPool) {
    let blacklist = Blacklist::new(pool);
    assert!(!blacklist.has("abc123").await.unwrap());
}

#[sqlx::test]
async fn added_hash_is_reported_as_blacklisted(pool: PgPool) {
    let blacklist = Blacklist::new(pool);
    blacklist.add("abc123").await.unwrap();
    assert!(blacklist.has("abc123").await.unwrap());
}

#[sqlx::test]
async fn adding_the_same_hash_twice_is_idempotent(pool: PgPool) {
    let blacklist = Blacklist::new(pool);
    blacklist.add("abc123").await.unwrap();
    blacklist.add("abc123").await.unwrap();
    assert!(blacklist.has("abc123").await.unwrap());
}
