use crate::domain::payment::PaymentSubmission;
use crate::gateways::{HealthReport, PaymentProcessor, ProcessorError, ALREADY_PROCESSED_STATUS};
use reqwest::Url;
use std::time::Duration;

/// Upstream processor reached over HTTP.
///
/// Submissions and health checks have separate timeouts so that a hung health
/// endpoint is reported unavailable long before a slow payment would time out.
pub struct HttpProcessor {
    pub base_url: Url,
    pub timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub client: reqwest::Client,
}

impl HttpProcessor {
    pub fn new(base_url: &str, timeout_ms: u64, health_timeout_ms: u64) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid processor url {base_url:?}: {e}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("processor url {base_url} cannot be used as a base");
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            timeout_ms,
            health_timeout_ms,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for HttpProcessor {
    async fn submit(&self, submission: &PaymentSubmission) -> Result<(), ProcessorError> {
        let resp = self
            .client
            .post(self.endpoint("/payments"))
            .json(submission)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == ALREADY_PROCESSED_STATUS {
            return Err(ProcessorError::AlreadyProcessed);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ProcessorError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }

    async fn health(&self) -> Result<HealthReport, ProcessorError> {
        let resp = self
            .client
            .get(self.endpoint("/payments/service-health"))
            .timeout(Duration::from_millis(self.health_timeout_ms))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProcessorError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice::<HealthReport>(&bytes)
            .map_err(|e| ProcessorError::Decode(e.to_string()))
    }
}
