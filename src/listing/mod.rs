//! The hardest subsystem (spec §4.E): a write-through, replace-per-upload
//! store for live auction listings, fronted by the two-tier cache in
//! `cache.rs`.

pub mod cache;
pub mod codec;

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sqlx::PgPool;

use crate::error::AppError;
use crate::metrics::names;
use crate::models::{Listing, Materia};
use cache::TwoTierCache;

pub struct ListingStore {
    pool: PgPool,
    cache: TwoTierCache,
}

impl ListingStore {
    pub fn new(pool: PgPool, cache: TwoTierCache) -> Self {
        Self { pool, cache }
    }

    /// Groups `listings` by `(world_id, item_id)`; for each group, deletes
    /// the existing rows and inserts the new ones in one transactional
    /// batch with `ON CONFLICT (listing_id) DO NOTHING`, all stamped with a
    /// common `uploaded_at`. A failed group leaves earlier groups committed
    /// (the open question in spec §9 — see DESIGN.md); the caller sees the
    /// first error. Each successfully-committed group invalidates both
    /// cache tiers.
    ///
    /// Pairs with no listings in the input simply have no group and are left
    /// untouched; see `replace_live_for` for the single-pair, empty-is-delete
    /// case the upload pipeline relies on.
    pub async fn replace_live(&self, listings: Vec<Listing>) -> Result<(), AppError> {
        for ((world_id, item_id), group) in group_by_world_item(listings) {
            self.replace_group(world_id, item_id, group).await?;
            self.cache.invalidate(&cache::cache_key(world_id, item_id));
        }

        Ok(())
    }

    /// Single-pair variant used by the upload pipeline, which always knows
    /// its `(world_id, item_id)` from the upload body regardless of whether
    /// any listings were uploaded. An empty `listings` is equivalent to
    /// `delete_live` (spec §4.E "Tie-break and edge cases") — a distinction
    /// the grouping in `replace_live` above cannot make on its own, since an
    /// empty list carries no `(world_id, item_id)` to group by.
    pub async fn replace_live_for(
        &self,
        world_id: i32,
        item_id: i32,
        listings: Vec<Listing>,
    ) -> Result<(), AppError> {
        if listings.is_empty() {
            return self.delete_live(world_id, item_id).await;
        }
        self.replace_group(world_id, item_id, listings).await?;
        self.cache.invalidate(&cache::cache_key(world_id, item_id));
        Ok(())
    }

    async fn replace_group(&self, world_id: i32, item_id: i32, group: Vec<Listing>) -> Result<(), AppError> {
        let uploaded_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Drop members of the pair's live set that are absent from this
        // upload. Rows whose listing_id IS in the incoming set are left
        // untouched here; the INSERT below then no-ops for them via
        // ON CONFLICT, which is how a re-uploaded listing_id retains its
        // original row instead of being reset (spec §4.E, scenario S2).
        let incoming_ids: Vec<&str> = group.iter().map(|l| l.listing_id.as_str()).collect();
        sqlx::query(
            "DELETE FROM listing WHERE world_id = $1 AND item_id = $2 AND listing_id <> ALL($3)",
        )
        .bind(world_id)
        .bind(item_id)
        .bind(&incoming_ids as &[&str])
        .execute(&mut *tx)
        .await?;

        for listing in &group {
            let materia_json = serde_json::to_value(&listing.materia)
                .map_err(|e| AppError::Durable(e.to_string()))?;

            sqlx::query(
                "INSERT INTO listing (
                    listing_id, item_id, world_id, hq, on_mannequin, materia, unit_price,
                    quantity, dye_id, creator_id, creator_name, last_review_time,
                    retainer_id, retainer_name, retainer_city_id, seller_id, uploaded_at, source
                 ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
                 ON CONFLICT (listing_id) DO NOTHING",
            )
            .bind(&listing.listing_id)
            .bind(item_id)
            .bind(world_id)
            .bind(listing.hq)
            .bind(listing.on_mannequin)
            .bind(materia_json)
            .bind(listing.unit_price)
            .bind(listing.quantity)
            .bind(listing.dye_id)
            .bind(&listing.creator_id)
            .bind(&listing.creator_name)
            .bind(listing.last_review_time)
            .bind(&listing.retainer_id)
            .bind(&listing.retainer_name)
            .bind(listing.retainer_city_id)
            .bind(&listing.seller_id)
            .bind(uploaded_at)
            .bind(&listing.source)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::counter!(names::LISTINGS_REPLACED_TOTAL).increment(group.len() as u64);
        Ok(())
    }

    pub async fn delete_live(&self, world_id: i32, item_id: i32) -> Result<(), AppError> {
        sqlx::query("DELETE FROM listing WHERE world_id = $1 AND item_id = $2")
            .bind(world_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        self.cache.invalidate(&cache::cache_key(world_id, item_id));
        Ok(())
    }

    pub async fn retrieve_live(&self, world_id: i32, item_id: i32) -> Result<Vec<Listing>, AppError> {
        let key = cache::cache_key(world_id, item_id);

        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let mut listings = self.fetch_from_db(&[world_id], &[item_id]).await?;
        listings.sort_by(|a, b| a.unit_price.cmp(&b.unit_price).then_with(|| a.listing_id.cmp(&b.listing_id)));

        self.cache.populate(&key, listings.clone());
        Ok(listings)
    }

    /// One round trip using `ANY($item_ids) AND ANY($world_ids)`; results
    /// re-sorted per pair, missing pairs map to empty sequences. Bypasses
    /// the cache entirely — fan-out reads (the Aggregator's DC view) are
    /// already a single query and don't benefit from per-pair caching here.
    pub async fn retrieve_many_live(
        &self,
        world_ids: &[i32],
        item_ids: &[i32],
    ) -> Result<HashMap<(i32, i32), Vec<Listing>>, AppError> {
        let rows = self.fetch_from_db(world_ids, item_ids).await?;

        let mut grouped: HashMap<(i32, i32), Vec<Listing>> = HashMap::new();
        for (world_id, item_id) in world_ids.iter().flat_map(|&w| item_ids.iter().map(move |&i| (w, i))) {
            grouped.entry((world_id, item_id)).or_default();
        }
        for listing in rows {
            grouped.entry((listing.world_id, listing.item_id)).or_default().push(listing);
        }
        for group in grouped.values_mut() {
            group.sort_by(|a, b| a.unit_price.cmp(&b.unit_price).then_with(|| a.listing_id.cmp(&b.listing_id)));
        }

        Ok(grouped)
    }

    async fn fetch_from_db(&self, world_ids: &[i32], item_ids: &[i32]) -> Result<Vec<Listing>, AppError> {
        #[allow(clippy::type_complexity)]
        let rows: Vec<(
            String,
            i32,
            i32,
            bool,
            bool,
            serde_json::Value,
            i64,
            i64,
            i32,
            String,
            String,
            chrono::DateTime<Utc>,
            String,
            String,
            i32,
            String,
            chrono::DateTime<Utc>,
            String,
        )> = sqlx::query_as(
            "SELECT listing_id, item_id, world_id, hq, on_mannequin, materia, unit_price,
                    quantity, dye_id, creator_id, creator_name, last_review_time,
                    retainer_id, retainer_name, retainer_city_id, seller_id, uploaded_at, source
             FROM listing
             WHERE world_id = ANY($1) AND item_id = ANY($2)",
        )
        .bind(world_ids)
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(row_to_listing)
            .collect::<Result<Vec<_>, _>>()
    }
}

#[allow(clippy::type_complexity)]
fn row_to_listing(
    row: (
        String,
        i32,
        i32,
        bool,
        bool,
        serde_json::Value,
        i64,
        i64,
        i32,
        String,
        String,
        chrono::DateTime<Utc>,
        String,
        String,
        i32,
        String,
        chrono::DateTime<Utc>,
        String,
    ),
) -> Result<Listing, AppError> {
    let (
        listing_id,
        item_id,
        world_id,
        hq,
        on_mannequin,
        materia_json,
        unit_price,
        quantity,
        dye_id,
        creator_id,
        creator_name,
        last_review_time,
        retainer_id,
        retainer_name,
        retainer_city_id,
        seller_id,
        uploaded_at,
        source,
    ) = row;

    let materia: Vec<Materia> =
        serde_json::from_value(materia_json).map_err(|e| AppError::Durable(e.to_string()))?;

    Ok(Listing {
        listing_id,
        item_id,
        world_id,
        hq,
        on_mannequin,
        materia,
        unit_price,
        quantity,
        dye_id,
        creator_id,
        creator_name,
        last_review_time,
        retainer_id,
        retainer_name,
        retainer_city_id,
        seller_id,
        uploaded_at,
        source,
    })
}

/// Groups an upload's listings by `(world_id, item_id)`, preserving
/// first-seen group order so replace batches are applied deterministically.
fn group_by_world_item(listings: Vec<Listing>) -> BTreeMap<(i32, i32), Vec<Listing>> {
    let mut groups: BTreeMap<(i32, i32), Vec<Listing>> = BTreeMap::new();
    for listing in listings {
        groups.entry((listing.world_id, listing.item_id)).or_default().push(listing);
    }
    groups
}
