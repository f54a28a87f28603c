//! DB-backed `TaxRatesStore`: round trip and missing-world behavior.

use sqlx::PgPool;

use marketboard_backend::models::TaxRates;
use marketboard_backend::tax_rates::TaxRatesStore;

#[sqlx::test]
async fn missing_world_returns_none(pool: PgPool) {
    let store = TaxRatesStore::new(pool);
    assert!(store.retrieve(23).await.unwrap().is_none());
}

#[sqlx::test]
async fn update_then_retrieve_round_trips_all_fields(pool: PgPool) {
    let store = TaxRatesStore::new(pool);
    let rates = TaxRates {
        limsa: Some(5),
        gridania: Some(5),
        uldah: Some(5),
        ishgard: Some(5),
        kugane: Some(5),
        crystarium: Some(5),
        old_sharlayan: Some(5),
        tuliyollal: Some(5),
        source: "TestApp".to_string(),
    };

    store.update(23, &rates).await.unwrap();
    let fetched = store.retrieve(23).await.unwrap().unwrap();
    assert_eq!(fetched, rates);
}

#[sqlx::test]
async fn update_overwrites_prior_values(pool: PgPool) {
    let store = TaxRatesStore::new(pool);
    let first = TaxRates {
        gridania: Some(5),
        source: "A".to_string(),
        ..Default::default()
    };
    let second = TaxRates {
        gridania: Some(4),
        source: "B".to_string(),
        ..Default::default()
    };

    store.update(23, &first).await.unwrap();
    store.update(23, &second).await.unwrap();

    let fetched = store.retrieve(23).await.unwrap().unwrap();
    assert_eq!(fetched.gridania, Some(4));
    assert_eq!(fetched.source, "B");
}
