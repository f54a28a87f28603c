//! The five upload behaviors from spec §4.H, each an independently
//! testable unit implementing `UploadBehavior`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Listing, Sale, TaxRates};

use super::{UploadBehavior, UploadContext};

pub struct ListingsBehavior;

#[async_trait]
impl UploadBehavior for ListingsBehavior {
    fn name(&self) -> &'static str {
        "listings"
    }

    fn should_execute(&self, ctx: &UploadContext) -> bool {
        ctx.body.listings.is_some() && ctx.body.world_id.is_some()
    }

    async fn execute(&self, ctx: &UploadContext) -> Result<(), AppError> {
        let world_id = ctx.body.world_id.expect("checked in should_execute");
        let item_id = ctx
            .body
            .item_id
            .ok_or_else(|| AppError::BadRequest("listings upload missing item_id".into()))?;
        let uploaded_listings = ctx.body.listings.as_ref().expect("checked in should_execute");

        let listings: Vec<Listing> = uploaded_listings
            .iter()
            .map(|u| Listing {
                listing_id: u.listing_id.clone(),
                item_id,
                world_id,
                hq: u.hq,
                on_mannequin: u.on_mannequin,
                materia: u.materia.clone(),
                unit_price: u.price_per_unit,
                quantity: u.quantity,
                dye_id: u.dye_id,
                creator_id: u.creator_id.clone(),
                creator_name: u.creator_name.clone(),
                last_review_time: u.last_review_time,
                retainer_id: u.retainer_id.clone(),
                retainer_name: u.retainer_name.clone(),
                retainer_city_id: u.retainer_city_id,
                seller_id: u.seller_id.clone(),
                uploaded_at: ctx.received_at,
                source: ctx.source.name.clone(),
            })
            .filter(|l| {
                if l.unit_price < 1 || l.quantity < 1 {
                    tracing::warn!(listing_id = %l.listing_id, "rejecting listing with non-positive price or quantity");
                    false
                } else {
                    true
                }
            })
            .collect();

        ctx.listings.replace_live_for(world_id, item_id, listings).await
    }
}

pub struct SalesBehavior;

#[async_trait]
impl UploadBehavior for SalesBehavior {
    fn name(&self) -> &'static str {
        "sales"
    }

    fn should_execute(&self, ctx: &UploadContext) -> bool {
        ctx.body.entries.is_some()
    }

    async fn execute(&self, ctx: &UploadContext) -> Result<(), AppError> {
        let entries = ctx.body.entries.as_ref().expect("checked in should_execute");

        let mut grouped: BTreeMap<(i32, i32), Vec<Sale>> = BTreeMap::new();
        for entry in entries {
            grouped
                .entry((entry.world_id, entry.item_id))
                .or_default()
                .push(Sale {
                    world_id: entry.world_id,
                    item_id: entry.item_id,
                    hq: entry.hq,
                    unit_price: entry.price_per_unit,
                    quantity: entry.quantity,
                    buyer_name: entry.buyer_name.clone(),
                    sold_at: entry.sold_at,
                });
        }

        for ((world_id, item_id), sales) in grouped {
            ctx.sales.append(world_id, item_id, &sales).await?;
        }
        Ok(())
    }
}

pub struct TaxRatesBehavior;

#[async_trait]
impl UploadBehavior for TaxRatesBehavior {
    fn name(&self) -> &'static str {
        "tax_rates"
    }

    fn should_execute(&self, ctx: &UploadContext) -> bool {
        ctx.body.tax_rates.is_some() && ctx.body.world_id.is_some()
    }

    async fn execute(&self, ctx: &UploadContext) -> Result<(), AppError> {
        let world_id = ctx.body.world_id.expect("checked in should_execute");
        let uploaded: TaxRates = ctx
            .body
            .tax_rates
            .clone()
            .expect("checked in should_execute")
            .into();

        let existing = ctx.tax_rates.retrieve(world_id).await?;
        let merged = TaxRates::merge(existing.as_ref(), &uploaded, ctx.source.name.clone());
        ctx.tax_rates.update(world_id, &merged).await
    }
}

pub struct TrustedSourceIncrementBehavior;

#[async_trait]
impl UploadBehavior for TrustedSourceIncrementBehavior {
    fn name(&self) -> &'static str {
        "trusted_source_increment"
    }

    fn should_execute(&self, _ctx: &UploadContext) -> bool {
        true
    }

    async fn execute(&self, ctx: &UploadContext) -> Result<(), AppError> {
        ctx.trusted_sources.increment(&ctx.source.api_key_sha512).await
    }
}

pub struct DailyUploadIncrementBehavior;

#[async_trait]
impl UploadBehavior for DailyUploadIncrementBehavior {
    fn name(&self) -> &'static str {
        "daily_upload_increment"
    }

    fn should_execute(&self, _ctx: &UploadContext) -> bool {
        true
    }

    async fn execute(&self, ctx: &UploadContext) -> Result<(), AppError> {
        ctx.upload_count_history.record_upload().await?;
        Ok(())
    }
}
