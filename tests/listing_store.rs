//! DB-backed `ListingStore` behavior: §8 scenarios S1/S2 and the
//! price-ascending / idempotent-replace invariants. Each test gets its own
//! throwaway database via `#[sqlx::test]`, migrated from `migrations/`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use marketboard_backend::listing::cache::{InMemoryCache, TwoTierCache};
use marketboard_backend::listing::ListingStore;
use marketboard_backend::models::Listing;

fn store(pool: PgPool) -> ListingStore {
    let cache = TwoTierCache::new(
        Duration::from_secs(60),
        1000,
        Arc::new(InMemoryCache::new()),
        Duration::from_secs(600),
        Duration::from_secs(1),
    );
    ListingStore::new(pool, cache)
}

fn listing(world_id: i32, item_id: i32, id: &str, price: i64) -> Listing {
    Listing {
        listing_id: id.to_string(),
        item_id,
        world_id,
        hq: false,
        on_mannequin: false,
        materia: vec![],
        unit_price: price,
        quantity: 1,
        dye_id: 0,
        creator_id: "c1".to_string(),
        creator_name: "Creator".to_string(),
        last_review_time: Utc::now(),
        retainer_id: "r1".to_string(),
        retainer_name: "Mannequin".to_string(),
        retainer_city_id: 1,
        seller_id: "s1".to_string(),
        uploaded_at: Utc::now(),
        source: "test".to_string(),
    }
}

#[sqlx::test]
async fn replace_then_read_returns_price_ascending(pool: PgPool) {
    let store = store(pool);

    store
        .replace_live(vec![
            listing(23, 5057, "A", 100),
            listing(23, 5057, "B", 50),
        ])
        .await
        .unwrap();

    let listings = store.retrieve_live(23, 5057).await.unwrap();
    let ids: Vec<&str> = listings.iter().map(|l| l.listing_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);
}

#[sqlx::test]
async fn reupload_of_same_listing_id_retains_original_row(pool: PgPool) {
    let store = store(pool);

    store
        .replace_live(vec![
            listing(23, 5057, "A", 100),
            listing(23, 5057, "B", 50),
        ])
        .await
        .unwrap();

    // Re-upload with A present at a different price and B absent: A's row
    // is untouched (ON CONFLICT DO NOTHING), B is dropped from the live set.
    store
        .replace_live(vec![listing(23, 5057, "A", 999)])
        .await
        .unwrap();

    let listings = store.retrieve_live(23, 5057).await.unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].listing_id, "A");
    assert_eq!(listings[0].unit_price, 100);
}

#[sqlx::test]
async fn empty_replace_is_equivalent_to_delete(pool: PgPool) {
    let store = store(pool);

    store.replace_live(vec![listing(23, 5057, "A", 100)]).await.unwrap();
    store.replace_live_for(23, 5057, vec![]).await.unwrap();

    let listings = store.retrieve_live(23, 5057).await.unwrap();
    assert!(listings.is_empty());
}

#[sqlx::test]
async fn own_write_is_immediately_visible_through_the_cache(pool: PgPool) {
    let store = store(pool);

    store
        .replace_live(vec![listing(23, 5057, "A", 100), listing(23, 5057, "B", 50)])
        .await
        .unwrap();

    // The write path invalidates both cache tiers before returning, so the
    // very next read of the same process does not serve stale L1 data.
    let listings = store.retrieve_live(23, 5057).await.unwrap();
    assert_eq!(listings.len(), 2);
}

#[sqlx::test]
async fn retrieve_many_live_covers_missing_pairs_with_empty_sequences(pool: PgPool) {
    let store = store(pool);

    store.replace_live(vec![listing(23, 5057, "A", 80)]).await.unwrap();

    let result = store.retrieve_many_live(&[23, 24], &[5057]).await.unwrap();
    assert_eq!(result[&(23, 5057)].len(), 1);
    assert!(result[&(24, 5057)].is_empty());
}
