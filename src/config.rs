use crate::router::processor_router::RouterConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database: String,
    pub shard_count: usize,
    pub read_pool_size: u32,
    pub processor_default_url: String,
    pub processor_fallback_url: String,
    pub upstream_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub health_poll_interval_ms: u64,
    pub fallback_first_poll_delay_ms: u64,
    pub availability_recheck_ms: u64,
    pub payment_wait_timeout_ms: u64,
    pub internal_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9999".to_string()),
            database: std::env::var("DATABASE").unwrap_or_else(|_| "data/payments".to_string()),
            shard_count: env_number("SHARD_COUNT", 16usize).max(1),
            read_pool_size: env_number("READ_POOL_SIZE", 4u32).max(1),
            processor_default_url: std::env::var("PAYMENT_PROCESSOR_URL_DEFAULT")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            processor_fallback_url: std::env::var("PAYMENT_PROCESSOR_URL_FALLBACK")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            upstream_timeout_ms: env_number("UPSTREAM_TIMEOUT_MS", 120_000),
            health_timeout_ms: env_number("HEALTH_TIMEOUT_MS", 2_000).max(1),
            health_poll_interval_ms: env_number("HEALTH_POLL_INTERVAL_MS", 5001),
            fallback_first_poll_delay_ms: env_number("FALLBACK_FIRST_POLL_DELAY_MS", 2500),
            availability_recheck_ms: env_number("AVAILABILITY_RECHECK_MS", 100),
            payment_wait_timeout_ms: env_number("PAYMENT_WAIT_TIMEOUT_MS", 0),
            internal_api_key: std::env::var("INTERNAL_API_KEY")
                .unwrap_or_else(|_| "dev-internal-key".to_string()),
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            health_poll_interval: Duration::from_millis(self.health_poll_interval_ms.max(1)),
            fallback_first_poll_delay: Duration::from_millis(self.fallback_first_poll_delay_ms),
            availability_recheck: Duration::from_millis(self.availability_recheck_ms.max(1)),
        }
    }

    /// `None` leaves the wait for a processor unbounded.
    pub fn payment_wait_timeout(&self) -> Option<Duration> {
        (self.payment_wait_timeout_ms > 0)
            .then(|| Duration::from_millis(self.payment_wait_timeout_ms))
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}
