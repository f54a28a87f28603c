//! DB-backed `UploadCountHistoryStore`: singleton rollover behavior
//! (spec §4.G).

use sqlx::PgPool;

use marketboard_backend::upload_count_history::UploadCountHistoryStore;

#[sqlx::test]
async fn retrieve_without_prior_writes_is_a_fresh_default(pool: PgPool) {
    let store = UploadCountHistoryStore::new(pool);
    let history = store.retrieve().await.unwrap();
    assert_eq!(history.counts, vec![0]);
}

#[sqlx::test]
async fn record_upload_persists_across_instances(pool: PgPool) {
    let store = UploadCountHistoryStore::new(pool.clone());
    store.record_upload().await.unwrap();
    store.record_upload().await.unwrap();

    let reloaded = UploadCountHistoryStore::new(pool);
    let history = reloaded.retrieve().await.unwrap();
    assert_eq!(*history.counts.last().unwrap(), 2);
}
