use crate::domain::payment::{PaymentSubmission, Processor};
use crate::gateways::{PaymentProcessor, ProcessorError};
use crate::router::health::{HealthPoller, HealthSnapshot, ProcessorHealth};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub health_poll_interval: Duration,
    pub fallback_first_poll_delay: Duration,
    pub availability_recheck: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            health_poll_interval: Duration::from_millis(5001),
            fallback_first_poll_delay: Duration::from_millis(2500),
            availability_recheck: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("payment was already processed by the {processor} processor")]
    AlreadyProcessed { processor: Processor },
    #[error("{processor} processor failed: {source}")]
    Upstream {
        processor: Processor,
        #[source]
        source: ProcessorError,
    },
    #[error("cancelled while waiting for an available processor")]
    Cancelled,
}

struct Lane {
    upstream: Arc<dyn PaymentProcessor>,
    health: Arc<ProcessorHealth>,
}

/// Chooses the upstream for each submission: `default` whenever it is healthy,
/// `fallback` otherwise, and waits while both are down.
pub struct ProcessorRouter {
    default: Lane,
    fallback: Lane,
    config: RouterConfig,
}

impl ProcessorRouter {
    pub fn new(
        default: Arc<dyn PaymentProcessor>,
        fallback: Arc<dyn PaymentProcessor>,
        config: RouterConfig,
    ) -> Self {
        Self {
            default: Lane {
                upstream: default,
                health: Arc::new(ProcessorHealth::new(Processor::Default)),
            },
            fallback: Lane {
                upstream: fallback,
                health: Arc::new(ProcessorHealth::new(Processor::Fallback)),
            },
            config,
        }
    }

    fn lane(&self, processor: Processor) -> &Lane {
        match processor {
            Processor::Default => &self.default,
            Processor::Fallback => &self.fallback,
        }
    }

    pub fn health_pollers(&self) -> [HealthPoller; 2] {
        [
            HealthPoller {
                upstream: self.default.upstream.clone(),
                health: self.default.health.clone(),
                interval: self.config.health_poll_interval,
                first_poll_delay: Duration::ZERO,
            },
            HealthPoller {
                upstream: self.fallback.upstream.clone(),
                health: self.fallback.health.clone(),
                interval: self.config.health_poll_interval,
                first_poll_delay: self.config.fallback_first_poll_delay,
            },
        ]
    }

    /// Starts one poller per upstream. Both run until `shutdown` is cancelled.
    pub fn spawn_health_pollers(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        self.health_pollers()
            .into_iter()
            .map(|poller| tokio::spawn(poller.run(shutdown.clone())))
            .collect()
    }

    pub fn is_available(&self, processor: Processor) -> bool {
        self.lane(processor).health.is_available()
    }

    pub fn any_available(&self) -> bool {
        self.select_available().is_some()
    }

    pub fn health_snapshot(&self) -> Vec<HealthSnapshot> {
        vec![self.default.health.snapshot(), self.fallback.health.snapshot()]
    }

    pub fn select_available(&self) -> Option<Processor> {
        if self.default.health.is_available() {
            Some(Processor::Default)
        } else if self.fallback.health.is_available() {
            Some(Processor::Fallback)
        } else {
            None
        }
    }

    /// Blocks until a processor is available. There is no upper bound other than
    /// `cancel`.
    pub async fn wait_for_target(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Processor, RouterError> {
        let mut waited = false;
        loop {
            if let Some(processor) = self.select_available() {
                if waited {
                    tracing::debug!(%processor, "processor became available after wait");
                }
                return Ok(processor);
            }
            if !waited {
                tracing::debug!("both processors unavailable, waiting");
                waited = true;
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(RouterError::Cancelled),
                _ = tokio::time::sleep(self.config.availability_recheck) => {}
            }
        }
    }

    /// Sends the submission to exactly one processor. The outcome of that call is
    /// returned as-is: no retry and no failover to the other processor.
    pub async fn submit(
        &self,
        submission: &PaymentSubmission,
        cancel: &CancellationToken,
    ) -> Result<Processor, RouterError> {
        let processor = self.wait_for_target(cancel).await?;
        let correlation_id = submission.correlation_id.as_str();
        tracing::debug!(%processor, correlation_id, "routing payment");

        match self.lane(processor).upstream.submit(submission).await {
            Ok(()) => Ok(processor),
            Err(ProcessorError::AlreadyProcessed) => {
                Err(RouterError::AlreadyProcessed { processor })
            }
            Err(source) => {
                tracing::warn!(%processor, correlation_id, "submission failed: {}", source);
                Err(RouterError::Upstream { processor, source })
            }
        }
    }
}
