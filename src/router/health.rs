use crate::domain::payment::Processor;
use crate::gateways::PaymentProcessor;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Last known health of one upstream. Written by its poller only, read lock-free by
/// every submission.
pub struct ProcessorHealth {
    processor: Processor,
    available: AtomicBool,
    last_checked_ms: AtomicI64,
    min_response_time_ms: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub processor: Processor,
    pub available: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub min_response_time_ms: u64,
}

impl ProcessorHealth {
    pub fn new(processor: Processor) -> Self {
        Self {
            processor,
            available: AtomicBool::new(false),
            last_checked_ms: AtomicI64::new(0),
            min_response_time_ms: AtomicU64::new(0),
        }
    }

    pub fn processor(&self) -> Processor {
        self.processor
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let checked = self.last_checked_ms.load(Ordering::Relaxed);
        HealthSnapshot {
            processor: self.processor,
            available: self.is_available(),
            last_checked: (checked > 0)
                .then(|| Utc.timestamp_millis_opt(checked).single())
                .flatten(),
            min_response_time_ms: self.min_response_time_ms.load(Ordering::Relaxed),
        }
    }

    /// Stores a poll result and returns the previous availability.
    pub(crate) fn record(&self, available: bool, min_response_time_ms: u64) -> bool {
        self.min_response_time_ms
            .store(min_response_time_ms, Ordering::Relaxed);
        self.last_checked_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.available.swap(available, Ordering::AcqRel)
    }
}

/// Periodic health check of a single upstream. Polls start on a fixed cadence of
/// `interval`; a poll that overruns delays the next one instead of bunching up.
pub struct HealthPoller {
    pub upstream: Arc<dyn PaymentProcessor>,
    pub health: Arc<ProcessorHealth>,
    pub interval: Duration,
    pub first_poll_delay: Duration,
}

impl HealthPoller {
    pub async fn run(self, shutdown: CancellationToken) {
        let processor = self.health.processor();
        if !self.first_poll_delay.is_zero() {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.first_poll_delay) => {}
            }
        }

        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }

        tracing::debug!(%processor, "health poller stopped");
    }

    pub async fn poll_once(&self) -> bool {
        let processor = self.health.processor();
        let (available, min_response_time) = match self.upstream.health().await {
            Ok(report) => (!report.failing, report.min_response_time),
            Err(e) => {
                tracing::debug!(%processor, "health check failed: {}", e);
                (false, 0)
            }
        };

        let was_available = self.health.record(available, min_response_time);
        match (was_available, available) {
            (false, true) => tracing::info!(%processor, min_response_time, "processor available"),
            (true, false) => tracing::warn!(%processor, "processor unavailable"),
            _ => {}
        }
        available
    }
}
