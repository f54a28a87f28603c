//! Prometheus metrics wiring.
//!
//! Installs a process-wide recorder at startup and exposes a handle whose
//! `render()` backs the `/metrics` route. Counters/histograms are recorded
//! inline at call sites (ingestion, aggregation, cache) via the `metrics`
//! facade macros, not through this module.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn install() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub mod names {
    pub const UPLOAD_REQUESTS_TOTAL: &str = "marketboard_upload_requests_total";
    pub const UPLOAD_REJECTED_TOTAL: &str = "marketboard_upload_rejected_total";
    pub const LISTINGS_REPLACED_TOTAL: &str = "marketboard_listings_replaced_total";
    pub const SALES_APPENDED_TOTAL: &str = "marketboard_sales_appended_total";
    pub const CACHE_L1_HITS_TOTAL: &str = "marketboard_cache_l1_hits_total";
    pub const CACHE_L2_HITS_TOTAL: &str = "marketboard_cache_l2_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "marketboard_cache_misses_total";
    pub const AGGREGATE_FETCH_SECONDS: &str = "marketboard_aggregate_fetch_seconds";
}
