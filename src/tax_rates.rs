//! Per-world city tax rates (spec §4.F).

use sqlx::PgPool;

use crate::error::AppError;
use crate::models::TaxRates;

pub struct TaxRatesStore {
    pool: PgPool,
}

impl TaxRatesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes all eight fields plus `source`; fire-and-forget is tolerated
    /// by callers (the upload pipeline does not block the response on this).
    pub async fn update(&self, world_id: i32, rates: &TaxRates) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO tax_rates (
                world_id, limsa, gridania, uldah, ishgard, kugane, crystarium,
                old_sharlayan, tuliyollal, source
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
             ON CONFLICT (world_id) DO UPDATE SET
                limsa = EXCLUDED.limsa,
                gridania = EXCLUDED.gridania,
                uldah = EXCLUDED.uldah,
                ishgard = EXCLUDED.ishgard,
                kugane = EXCLUDED.kugane,
                crystarium = EXCLUDED.crystarium,
                old_sharlayan = EXCLUDED.old_sharlayan,
                tuliyollal = EXCLUDED.tuliyollal,
                source = EXCLUDED.source",
        )
        .bind(world_id)
        .bind(rates.limsa)
        .bind(rates.gridania)
        .bind(rates.uldah)
        .bind(rates.ishgard)
        .bind(rates.kugane)
        .bind(rates.crystarium)
        .bind(rates.old_sharlayan)
        .bind(rates.tuliyollal)
        .bind(&rates.source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// A single-row `SELECT *`, reading all eight fields together rather
    /// than with per-field round trips; missing world returns `None`.
    pub async fn retrieve(&self, world_id: i32) -> Result<Option<TaxRates>, AppError> {
        let row: Option<(
            Option<i32>,
            Option<i32>,
            Option<i32>,
            Option<i32>,
            Option<i32>,
            Option<i32>,
            Option<i32>,
            Option<i32>,
            String,
        )> = sqlx::query_as(
            "SELECT limsa, gridania, uldah, ishgard, kugane, crystarium, old_sharlayan, tuliyollal, source
             FROM tax_rates WHERE world_id = $1",
        )
        .bind(world_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(limsa, gridania, uldah, ishgard, kugane, crystarium, old_sharlayan, tuliyollal, source)| TaxRates {
                limsa,
                gridania,
                uldah,
                ishgard,
                kugane,
                crystarium,
                old_sharlayan,
                tuliyollal,
                source,
            },
        ))
    }
}
