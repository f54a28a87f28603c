//! Combines per-world listings/sales into per-data-center views (spec
//! §4.I). Sits above `WorldDcResolver`, `ListingStore` and `SalesStore`;
//! knows nothing about HTTP or the upload pipeline.

use std::sync::Arc;
use std::time::Instant;

use crate::api::dto::{ListingView, ListingsResponse, SaleView, SalesResponse};
use crate::error::AppError;
use crate::listing::ListingStore;
use crate::metrics::names;
use crate::models::{Listing, Sale};
use crate::sales::SalesStore;
use crate::world::{WorldDcResolver, WorldOrDc};

pub struct Aggregator {
    resolver: Arc<WorldDcResolver>,
    listings: Arc<ListingStore>,
    sales: Arc<SalesStore>,
}

impl Aggregator {
    pub fn new(resolver: Arc<WorldDcResolver>, listings: Arc<ListingStore>, sales: Arc<SalesStore>) -> Self {
        Self {
            resolver,
            listings,
            sales,
        }
    }

    pub fn resolver(&self) -> &WorldDcResolver {
        &self.resolver
    }

    fn world_name(&self, world_id: i32) -> String {
        self.resolver
            .worlds_by_id()
            .get(&world_id)
            .map(|w| w.name.clone())
            .unwrap_or_default()
    }

    /// Resolves `token` and fetches current listings: a single-world fetch
    /// for a World, or a merged price-ascending view across every member
    /// world for a Dc, each listing annotated with its source world.
    pub async fn resolve_and_fetch_listings(&self, item_id: i32, token: &str) -> Result<ListingsResponse, AppError> {
        let started = Instant::now();
        let result = self.resolve_and_fetch_listings_inner(item_id, token).await;
        metrics::histogram!(names::AGGREGATE_FETCH_SECONDS, "route" => "listings")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn resolve_and_fetch_listings_inner(&self, item_id: i32, token: &str) -> Result<ListingsResponse, AppError> {
        match self.resolver.resolve(token)? {
            WorldOrDc::World(world) => {
                let listings = self.listings.retrieve_live(world.id, item_id).await?;
                let views = listings
                    .iter()
                    .map(|l| ListingView::from_domain(l, &world.name))
                    .collect();
                Ok(ListingsResponse {
                    item_id,
                    world_id: Some(world.id),
                    dc_name: None,
                    listings: views,
                })
            }
            WorldOrDc::Dc(dc) => {
                let grouped = self.listings.retrieve_many_live(&dc.world_ids, &[item_id]).await?;

                let mut merged: Vec<Listing> = dc
                    .world_ids
                    .iter()
                    .flat_map(|world_id| {
                        grouped
                            .get(&(*world_id, item_id))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect();
                merged.sort_by(|a, b| {
                    a.unit_price
                        .cmp(&b.unit_price)
                        .then_with(|| a.listing_id.cmp(&b.listing_id))
                });

                let views = merged
                    .iter()
                    .map(|l| ListingView::from_domain(l, &self.world_name(l.world_id)))
                    .collect();

                Ok(ListingsResponse {
                    item_id,
                    world_id: None,
                    dc_name: Some(dc.name.clone()),
                    listings: views,
                })
            }
        }
    }

    /// Resolves `token` and fetches recent sales: a single-world fetch, or
    /// a merge-by-`sold_at`-descending view across a Dc's member worlds.
    pub async fn resolve_and_fetch_sales(
        &self,
        item_id: i32,
        token: &str,
        limit: i64,
    ) -> Result<SalesResponse, AppError> {
        let started = Instant::now();
        let result = self.resolve_and_fetch_sales_inner(item_id, token, limit).await;
        metrics::histogram!(names::AGGREGATE_FETCH_SECONDS, "route" => "history")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn resolve_and_fetch_sales_inner(
        &self,
        item_id: i32,
        token: &str,
        limit: i64,
    ) -> Result<SalesResponse, AppError> {
        match self.resolver.resolve(token)? {
            WorldOrDc::World(world) => {
                let sales = self.sales.recent(world.id, item_id, limit).await?;
                let views = sales.iter().map(|s| SaleView::from_domain(s, &world.name)).collect();
                Ok(SalesResponse {
                    item_id,
                    world_id: Some(world.id),
                    dc_name: None,
                    entries: views,
                })
            }
            WorldOrDc::Dc(dc) => {
                let mut merged: Vec<Sale> = Vec::new();
                for &world_id in &dc.world_ids {
                    merged.extend(self.sales.recent(world_id, item_id, limit).await?);
                }
                merged.sort_by(|a, b| b.sold_at.cmp(&a.sold_at));
                merged.truncate(limit.max(0) as usize);

                let views = merged
                    .iter()
                    .map(|s| SaleView::from_domain(s, &self.world_name(s.world_id)))
                    .collect();

                Ok(SalesResponse {
                    item_id,
                    world_id: None,
                    dc_name: Some(dc.name.clone()),
                    entries: views,
                })
            }
        }
    }
}
