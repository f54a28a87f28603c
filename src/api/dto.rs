//! Wire types for the HTTP surface. Kept separate from `crate::models` so
//! upload-schema churn never leaks into the store API (spec SPEC_FULL §3
//! "added Wire types").

use serde::{Deserialize, Serialize};

use crate::models::{Listing, Materia, Sale, TaxRates};

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    pub world_id: Option<i32>,
    pub item_id: Option<i32>,
    pub uploader_id: String,
    pub listings: Option<Vec<UploadListing>>,
    pub entries: Option<Vec<UploadSale>>,
    pub tax_rates: Option<UploadTaxRates>,
}

#[derive(Debug, Deserialize)]
pub struct UploadListing {
    pub listing_id: String,
    pub hq: bool,
    #[serde(default)]
    pub on_mannequin: bool,
    #[serde(default)]
    pub materia: Vec<Materia>,
    pub price_per_unit: i64,
    pub quantity: i64,
    #[serde(default)]
    pub dye_id: i32,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub creator_name: String,
    pub last_review_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub retainer_id: String,
    pub retainer_name: String,
    pub retainer_city_id: i32,
    pub seller_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadSale {
    pub world_id: i32,
    pub item_id: i32,
    pub hq: bool,
    pub price_per_unit: i64,
    pub quantity: i64,
    pub buyer_name: String,
    pub sold_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UploadTaxRates {
    pub limsa: Option<i32>,
    pub gridania: Option<i32>,
    pub uldah: Option<i32>,
    pub ishgard: Option<i32>,
    pub kugane: Option<i32>,
    pub crystarium: Option<i32>,
    pub old_sharlayan: Option<i32>,
    pub tuliyollal: Option<i32>,
}

impl From<UploadTaxRates> for TaxRates {
    fn from(u: UploadTaxRates) -> Self {
        TaxRates {
            limsa: u.limsa,
            gridania: u.gridania,
            uldah: u.uldah,
            ishgard: u.ishgard,
            kugane: u.kugane,
            crystarium: u.crystarium,
            old_sharlayan: u.old_sharlayan,
            tuliyollal: u.tuliyollal,
            source: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingView {
    pub listing_id: String,
    pub world_id: i32,
    pub world_name: String,
    pub hq: bool,
    pub on_mannequin: bool,
    pub materia: Vec<Materia>,
    pub price_per_unit: i64,
    pub quantity: i64,
    pub retainer_name: String,
    pub retainer_city: i32,
    pub seller_id: String,
    pub last_review_time: i64,
}

impl ListingView {
    pub fn from_domain(listing: &Listing, world_name: &str) -> Self {
        Self {
            listing_id: listing.listing_id.clone(),
            world_id: listing.world_id,
            world_name: world_name.to_string(),
            hq: listing.hq,
            on_mannequin: listing.on_mannequin,
            materia: listing.materia.clone(),
            price_per_unit: listing.unit_price,
            quantity: listing.quantity,
            retainer_name: listing.retainer_name.clone(),
            retainer_city: listing.retainer_city_id,
            seller_id: listing.seller_id.clone(),
            last_review_time: listing.last_review_time.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub item_id: i32,
    pub world_id: Option<i32>,
    pub dc_name: Option<String>,
    pub listings: Vec<ListingView>,
}

#[derive(Debug, Serialize)]
pub struct SaleView {
    pub world_id: i32,
    pub world_name: String,
    pub hq: bool,
    pub price_per_unit: i64,
    pub quantity: i64,
    pub buyer_name: String,
    pub timestamp: i64,
}

impl SaleView {
    pub fn from_domain(sale: &Sale, world_name: &str) -> Self {
        Self {
            world_id: sale.world_id,
            world_name: world_name.to_string(),
            hq: sale.hq,
            price_per_unit: sale.unit_price,
            quantity: sale.quantity,
            buyer_name: sale.buyer_name.clone(),
            timestamp: sale.sold_at.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SalesResponse {
    pub item_id: i32,
    pub world_id: Option<i32>,
    pub dc_name: Option<String>,
    pub entries: Vec<SaleView>,
}
