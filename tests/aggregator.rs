//! `Aggregator` end-to-end behavior: §8 scenario S3, merging listings from
//! every member world of a data center into one price-ascending view. Each
//! test gets its own throwaway database via `#[sqlx::test]`, migrated from
//! `migrations/`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use marketboard_backend::aggregator::Aggregator;
use marketboard_backend::listing::cache::{InMemoryCache, TwoTierCache};
use marketboard_backend::listing::ListingStore;
use marketboard_backend::models::{DataCenter, Listing, World};
use marketboard_backend::sales::SalesStore;
use marketboard_backend::world::WorldDcResolver;

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

fn two_world_resolver() -> WorldDcResolver {
    let worlds = vec![
        World { id: 23, name: "Coeurl".to_string(), data_center_id: 5, is_public: true },
        World { id: 24, name: "Zalera".to_string(), data_center_id: 5, is_public: true },
    ];
    let data_centers = vec![DataCenter {
        id: 5,
        name: "Crystal".to_string(),
        region: "America".to_string(),
        world_ids: vec![23, 24],
    }];

    WorldDcResolver::new(marketboard_backend::gamedata::Catalog {
        worlds,
        data_centers,
        regions: vec![],
        marketable_items: BTreeSet::new(),
        stack_sizes: HashMap::new(),
    })
}

#[sqlx::test]
async fn dc_token_merges_member_worlds_price_ascending(pool: PgPool) {
    let cache = TwoTierCache::new(
        Duration::from_secs(60),
        1000,
        Arc::new(InMemoryCache::new()),
        Duration::from_secs(600),
        Duration::from_secs(1),
    );
    let listings = Arc::new(ListingStore::new(pool.clone(), cache));
    let sales = Arc::new(SalesStore::new(pool));
    let resolver = Arc::new(two_world_resolver());
    let aggregator = Aggregator::new(resolver, listings.clone(), sales);

    listings
        .replace_live(vec![listing(23, 5057, "A", 100), listing(23, 5057, "B", 300)])
        .await
        .unwrap();
    listings
        .replace_live(vec![listing(24, 5057, "C", 50)])
        .await
        .unwrap();

    let view = aggregator.resolve_and_fetch_listings(5057, "Crystal").await.unwrap();

    assert_eq!(view.dc_name.as_deref(), Some("Crystal"));
    assert!(view.world_id.is_none());
    let ids: Vec<&str> = view.listings.iter().map(|l| l.listing_id.as_str()).collect();
    assert_eq!(ids, vec!["C", "A", "B"], "merged view must be price-ascending across both worlds");
    assert_eq!(view.listings[0].world_name, "Zalera");
    assert_eq!(view.listings[1].world_name, "Coeurl");
}
