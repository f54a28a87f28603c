//! Process configuration
//! Mission: Load runtime configuration from the environment once at startup

use anyhow::{Context, Result};
use std::time::Duration;

/// Application configuration, loaded once in `main` and passed down as an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub game_data_path: Option<String>,
    pub cache_l1_ttl: Duration,
    pub cache_l2_ttl: Duration,
    pub cache_l1_capacity: u64,
    pub l2_probe_timeout: Duration,
    pub redis_read_replicas: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set (Postgres connection string)")?;

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let game_data_path = std::env::var("GAME_DATA_PATH").ok();

        let cache_l1_ttl_secs: u64 = std::env::var("CACHE_L1_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let cache_l2_ttl_secs: u64 = std::env::var("CACHE_L2_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        let cache_l1_capacity: u64 = std::env::var("CACHE_L1_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);

        let l2_probe_timeout_ms: u64 = std::env::var("CACHE_L2_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1_000);

        let redis_read_replicas: u32 = std::env::var("REDIS_READ_REPLICAS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            database_url,
            redis_url,
            port,
            game_data_path,
            cache_l1_ttl: Duration::from_secs(cache_l1_ttl_secs),
            cache_l2_ttl: Duration::from_secs(cache_l2_ttl_secs),
            cache_l1_capacity,
            l2_probe_timeout: Duration::from_millis(l2_probe_timeout_ms),
            redis_read_replicas,
        })
    }
}
