//! DB-backed `SalesStore` behavior: append-only idempotent inserts,
//! newest-first retrieval (spec §8 property 4).

use chrono::{Duration, Utc};
use sqlx::PgPool;

use marketboard_backend::models::Sale;
use marketboard_backend::sales::SalesStore;

fn sale(sold_at_offset_secs: i64, price: i64, buyer: &str) -> Sale {
    Sale {
        world_id: 23,
        item_id: 5057,
        hq: false,
        unit_price: price,
        quantity: 1,
        buyer_name: buyer.to_string(),
        sold_at: Utc::now() + Duration::seconds(sold_at_offset_secs),
    }
}

#[sqlx::test]
async fn recent_orders_newest_first(pool: PgPool) {
    let store = SalesStore::new(pool);

    store
        .append(23, 5057, &[sale(-10, 100, "alice"), sale(0, 50, "bob")])
        .await
        .unwrap();

    let recent = store.recent(23, 5057, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].buyer_name, "bob");
    assert_eq!(recent[1].buyer_name, "alice");
}

#[sqlx::test]
async fn duplicate_sale_rows_are_ignored_on_replay(pool: PgPool) {
    let store = SalesStore::new(pool);
    let s = sale(0, 100, "alice");

    store.append(23, 5057, &[s.clone()]).await.unwrap();
    store.append(23, 5057, &[s]).await.unwrap();

    let recent = store.recent(23, 5057, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
}

#[sqlx::test]
async fn recent_respects_limit(pool: PgPool) {
    let store = SalesStore::new(pool);
    let sales: Vec<Sale> = (0..5).map(|i| sale(i, 10 + i, &format!("buyer{i}"))).collect();
    store.append(23, 5057, &sales).await.unwrap();

    let recent = store.recent(23, 5057, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
}
