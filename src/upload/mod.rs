//! The upload pipeline (spec §4.H): authenticate, validate, hash, consult
//! the blacklist, then run an ordered chain of independently testable
//! behaviors — fail-fast, with no rollback of behaviors that already ran.
//!
//! State machine: `Received -> Authenticated -> Hashed ->
//! (Blacklisted => Done) | (running behaviors in order) -> Done|Failed`.

pub mod behaviors;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::api::dto::UploadBody;
use crate::auth::TrustedSourceRegistry;
use crate::blacklist::Blacklist;
use crate::error::AppError;
use crate::listing::ListingStore;
use crate::metrics::names;
use crate::models::TrustedSource;
use crate::sales::SalesStore;
use crate::tax_rates::TaxRatesStore;
use crate::upload_count_history::UploadCountHistoryStore;

/// Everything a behavior needs to inspect the upload and reach a store.
/// Built fresh per upload, after authentication and the blacklist check.
pub struct UploadContext {
    pub body: UploadBody,
    pub source: TrustedSource,
    pub received_at: DateTime<Utc>,
    pub listings: Arc<ListingStore>,
    pub sales: Arc<SalesStore>,
    pub tax_rates: Arc<TaxRatesStore>,
    pub trusted_sources: Arc<TrustedSourceRegistry>,
    pub upload_count_history: Arc<UploadCountHistoryStore>,
}

/// One independently testable unit in the pipeline (spec §9 "behavior
/// chain as dynamic dispatch"). No inheritance, just a small trait object.
#[async_trait]
pub trait UploadBehavior: Send + Sync {
    fn name(&self) -> &'static str;
    fn should_execute(&self, ctx: &UploadContext) -> bool;
    async fn execute(&self, ctx: &UploadContext) -> Result<(), AppError>;
}

/// The outcome the HTTP layer maps to a response: blacklisted uploads still
/// return 200 with no visible side effects (spec invariant 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted,
    Blacklisted,
}

pub struct UploadPipeline {
    trusted_sources: Arc<TrustedSourceRegistry>,
    blacklist: Arc<Blacklist>,
    listings: Arc<ListingStore>,
    sales: Arc<SalesStore>,
    tax_rates: Arc<TaxRatesStore>,
    upload_count_history: Arc<UploadCountHistoryStore>,
    behaviors: Vec<Box<dyn UploadBehavior>>,
}

impl UploadPipeline {
    /// Builds the pipeline with the default behavior order from spec §4.H:
    /// listings, sales, tax rates, then the two unconditional counters.
    pub fn new(
        trusted_sources: Arc<TrustedSourceRegistry>,
        blacklist: Arc<Blacklist>,
        listings: Arc<ListingStore>,
        sales: Arc<SalesStore>,
        tax_rates: Arc<TaxRatesStore>,
        upload_count_history: Arc<UploadCountHistoryStore>,
    ) -> Self {
        let behaviors: Vec<Box<dyn UploadBehavior>> = vec![
            Box::new(behaviors::ListingsBehavior),
            Box::new(behaviors::SalesBehavior),
            Box::new(behaviors::TaxRatesBehavior),
            Box::new(behaviors::TrustedSourceIncrementBehavior),
            Box::new(behaviors::DailyUploadIncrementBehavior),
        ];

        Self {
            trusted_sources,
            blacklist,
            listings,
            sales,
            tax_rates,
            upload_count_history,
            behaviors,
        }
    }

    pub async fn handle(&self, api_key_plaintext: &str, body: UploadBody) -> Result<UploadOutcome, AppError> {
        let source = self
            .trusted_sources
            .get(api_key_plaintext)
            .await?
            .ok_or_else(|| AppError::Forbidden("unknown api key".into()))?;

        validate_structure(&body)?;

        let uploader_hash = hash_uploader_id(&body.uploader_id);

        if self.blacklist.has(&uploader_hash).await? {
            metrics::counter!(names::UPLOAD_REJECTED_TOTAL).increment(1);
            tracing::info!(source = %source.name, "upload suppressed: blacklisted uploader");
            return Ok(UploadOutcome::Blacklisted);
        }

        let ctx = UploadContext {
            body,
            source,
            received_at: Utc::now(),
            listings: self.listings.clone(),
            sales: self.sales.clone(),
            tax_rates: self.tax_rates.clone(),
            trusted_sources: self.trusted_sources.clone(),
            upload_count_history: self.upload_count_history.clone(),
        };

        // Fail-fast: the first behavior that errors stops the chain; earlier
        // behaviors' side effects are not rolled back (spec §4.H).
        for behavior in &self.behaviors {
            if behavior.should_execute(&ctx) {
                behavior.execute(&ctx).await.map_err(|err| {
                    tracing::warn!(behavior = behavior.name(), error = %err, "upload behavior failed");
                    err
                })?;
            }
        }

        metrics::counter!(names::UPLOAD_REQUESTS_TOTAL).increment(1);
        Ok(UploadOutcome::Accepted)
    }
}

/// SHA-256 of the client-reported uploader id, used only as the opaque
/// blacklist key — never logged or persisted alongside a plaintext id.
fn hash_uploader_id(uploader_id: &str) -> String {
    hex::encode(Sha256::digest(uploader_id.as_bytes()))
}

/// Structural validation ahead of hashing/dispatch (spec §4.H step 2).
/// Anything deeper (price/quantity bounds) is each behavior's own concern.
fn validate_structure(body: &UploadBody) -> Result<(), AppError> {
    if body.uploader_id.trim().is_empty() {
        return Err(AppError::BadRequest("uploader_id must not be empty".into()));
    }
    if let Some(listings) = &body.listings {
        if body.world_id.is_none() {
            return Err(AppError::BadRequest("listings upload missing world_id".into()));
        }
        for listing in listings {
            if listing.listing_id.trim().is_empty() {
                return Err(AppError::BadRequest("listing_id must not be empty".into()));
            }
        }
    }
    if let Some(entries) = &body.entries {
        for entry in entries {
            if entry.quantity < 1 {
                return Err(AppError::BadRequest("sale quantity must be >= 1".into()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_uploader_id_is_deterministic_sha256_hex() {
        let hash = hash_uploader_id("bad");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_uploader_id("bad"));
        assert_ne!(hash, hash_uploader_id("good"));
    }

    #[test]
    fn rejects_empty_uploader_id() {
        let body = UploadBody {
            world_id: None,
            item_id: None,
            uploader_id: "  ".into(),
            listings: None,
            entries: None,
            tax_rates: None,
        };
        assert!(matches!(validate_structure(&body), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_listings_without_world_id() {
        let body = UploadBody {
            world_id: None,
            item_id: Some(5057),
            uploader_id: "abc".into(),
            listings: Some(vec![]),
            entries: None,
            tax_rates: None,
        };
        assert!(matches!(validate_structure(&body), Err(AppError::BadRequest(_))));
    }
}
