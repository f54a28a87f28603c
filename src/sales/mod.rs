//! Append-only per-(world,item) sale history (spec §4.D).
//!
//! No cache tier: reads are infrequent relative to listing reads and
//! histories grow monotonically, so the relational store is queried
//! directly on every `recent` call.

use sqlx::PgPool;

use crate::error::AppError;
use crate::metrics::names;
use crate::models::Sale;

pub struct SalesStore {
    pool: PgPool,
}

impl SalesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts each sale once; duplicates on
    /// `(world_id,item_id,sold_at,unit_price,quantity,buyer_name)` are
    /// ignored, making repeated uploads of the same history idempotent.
    pub async fn append(&self, world_id: i32, item_id: i32, sales: &[Sale]) -> Result<(), AppError> {
        if sales.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for sale in sales {
            sqlx::query(
                "INSERT INTO sale (world_id, item_id, sold_at, unit_price, quantity, buyer_name, hq)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (world_id, item_id, sold_at, unit_price, quantity, buyer_name) DO NOTHING",
            )
            .bind(world_id)
            .bind(item_id)
            .bind(sale.sold_at)
            .bind(sale.unit_price)
            .bind(sale.quantity)
            .bind(&sale.buyer_name)
            .bind(sale.hq)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::counter!(names::SALES_APPENDED_TOTAL).increment(sales.len() as u64);
        Ok(())
    }

    /// Most recent `limit` sales for a (world,item) pair, newest first.
    pub async fn recent(&self, world_id: i32, item_id: i32, limit: i64) -> Result<Vec<Sale>, AppError> {
        let rows: Vec<(i32, i32, bool, i64, i64, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT world_id, item_id, hq, unit_price, quantity, buyer_name, sold_at
             FROM sale
             WHERE world_id = $1 AND item_id = $2
             ORDER BY sold_at DESC
             LIMIT $3",
        )
        .bind(world_id)
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(world_id, item_id, hq, unit_price, quantity, buyer_name, sold_at)| Sale {
                    world_id,
                    item_id,
                    hq,
                    unit_price,
                    quantity,
                    buyer_name,
                    sold_at,
                },
            )
            .collect())
    }
}
