//! Domain types shared across stores, the upload pipeline, and the HTTP surface.
//!
//! These are persistence/business types. Upload-body and HTTP-response shapes
//! live in `api::dto` so that wire-schema churn never leaks in here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single piece of augmentation slotted into a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Materia {
    pub slot_id: i32,
    pub materia_id: i32,
}

/// A live market-board listing, as currently standing on a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: String,
    pub item_id: i32,
    pub world_id: i32,
    pub hq: bool,
    pub on_mannequin: bool,
    pub materia: Vec<Materia>,
    pub unit_price: i64,
    pub quantity: i64,
    pub dye_id: i32,
    pub creator_id: String,
    pub creator_name: String,
    pub last_review_time: DateTime<Utc>,
    pub retainer_id: String,
    pub retainer_name: String,
    pub retainer_city_id: i32,
    pub seller_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub source: String,
}

/// A single completed sale, sourced from a trusted client's purchase history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub world_id: i32,
    pub item_id: i32,
    pub hq: bool,
    pub unit_price: i64,
    pub quantity: i64,
    pub buyer_name: String,
    pub sold_at: DateTime<Utc>,
}

/// Per-world city tax rates, keyed by `world_id` at the store level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxRates {
    pub limsa: Option<i32>,
    pub gridania: Option<i32>,
    pub uldah: Option<i32>,
    pub ishgard: Option<i32>,
    pub kugane: Option<i32>,
    pub crystarium: Option<i32>,
    pub old_sharlayan: Option<i32>,
    pub tuliyollal: Option<i32>,
    pub source: String,
}

impl TaxRates {
    /// Merge an uploaded (possibly partially-null) set of rates onto an
    /// existing record: uploaded field wins if present, else the existing
    /// value is kept, else 0. See spec §4.F / scenario S5.
    pub fn merge(existing: Option<&TaxRates>, uploaded: &TaxRates, source: String) -> TaxRates {
        let pick = |up: Option<i32>, ex: Option<i32>| Some(up.or(ex).unwrap_or(0));
        let existing = existing.cloned().unwrap_or_default();
        TaxRates {
            limsa: pick(uploaded.limsa, existing.limsa),
            gridania: pick(uploaded.gridania, existing.gridania),
            uldah: pick(uploaded.uldah, existing.uldah),
            ishgard: pick(uploaded.ishgard, existing.ishgard),
            kugane: pick(uploaded.kugane, existing.kugane),
            crystarium: pick(uploaded.crystarium, existing.crystarium),
            old_sharlayan: pick(uploaded.old_sharlayan, existing.old_sharlayan),
            tuliyollal: pick(uploaded.tuliyollal, existing.tuliyollal),
            source,
        }
    }
}

/// A trusted client allowed to upload data, identified by the SHA-512 of its plaintext API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedSource {
    pub api_key_sha512: String,
    pub name: String,
    pub upload_count: i64,
}

/// Singleton 30-day rolling window of daily upload counters; `counts[0]` is today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCountHistory {
    pub last_push: DateTime<Utc>,
    pub counts: Vec<i64>,
}

impl Default for UploadCountHistory {
    fn default() -> Self {
        Self {
            last_push: Utc::now(),
            counts: vec![0],
        }
    }
}

const ROLLOVER_MS: i64 = 86_400_000;
const MAX_COUNTS: usize = 30;

impl UploadCountHistory {
    /// Apply one upload's worth of the rollover/increment rule from spec §4.G.
    pub fn record_upload(&mut self, now: DateTime<Utc>) {
        let elapsed_ms = (now - self.last_push).num_milliseconds();
        if elapsed_ms > ROLLOVER_MS {
            self.counts.insert(0, 0);
            self.counts.truncate(MAX_COUNTS);
            self.last_push = now;
        }
        if self.counts.is_empty() {
            self.counts.push(0);
        }
        self.counts[0] += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: i32,
    pub name: String,
    pub data_center_id: i32,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCenter {
    pub id: i32,
    pub name: String,
    pub region: String,
    pub world_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: i32,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rates_merge_keeps_existing_when_upload_field_is_null() {
        let existing = TaxRates {
            limsa: Some(5),
            gridania: Some(5),
            uldah: Some(5),
            ishgard: Some(5),
            kugane: Some(5),
            crystarium: Some(5),
            old_sharlayan: Some(5),
            tuliyollal: Some(5),
            source: "Old".into(),
        };
        let uploaded = TaxRates {
            gridania: Some(4),
            ..Default::default()
        };
        let merged = TaxRates::merge(Some(&existing), &uploaded, "X".into());
        assert_eq!(merged.limsa, Some(5));
        assert_eq!(merged.gridania, Some(4));
        assert_eq!(merged.source, "X");
    }

    #[test]
    fn upload_count_history_rolls_over_after_a_day() {
        let mut h = UploadCountHistory {
            last_push: Utc::now() - chrono::Duration::milliseconds(ROLLOVER_MS + 1),
            counts: vec![3, 2],
        };
        h.record_upload(Utc::now());
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts.len(), 3);
    }

    #[test]
    fn upload_count_history_increments_within_same_day() {
        let mut h = UploadCountHistory {
            last_push: Utc::now(),
            counts: vec![3],
        };
        h.record_upload(Utc::now());
        assert_eq!(h.counts[0], 4);
        assert_eq!(h.counts.len(), 1);
    }

    #[test]
    fn upload_count_history_caps_at_thirty_entries() {
        let mut h = UploadCountHistory {
            last_push: Utc::now() - chrono::Duration::milliseconds(ROLLOVER_MS + 1),
            counts: (0..30).collect(),
        };
        h.record_upload(Utc::now());
        assert_eq!(h.counts.len(), 30);
    }
}
