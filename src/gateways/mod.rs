use crate::domain::payment::PaymentSubmission;
use serde::Deserialize;

pub mod http_processor;
pub mod mock;

/// Status an upstream answers with when the correlation id was already accepted.
pub const ALREADY_PROCESSED_STATUS: u16 = 422;

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("payment was already processed, check correlationId")]
    AlreadyProcessed,
    #[error("upstream responded {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected upstream payload: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub failing: bool,
    #[serde(default)]
    pub min_response_time: u64,
}

#[async_trait::async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn submit(&self, submission: &PaymentSubmission) -> Result<(), ProcessorError>;

    async fn health(&self) -> Result<HealthReport, ProcessorError>;
}
