use crate::domain::payment::{
    format_range_bound, PaymentRecord, PaymentSubmission, PaymentsSummary, Processor,
};
use crate::repo::payments_repo::PaymentsRepo;
use crate::router::processor_router::{ProcessorRouter, RouterError};
use crate::storage::{ShardErrors, ShardedStore, StorageError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("payment task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("summary is missing shards: {source}")]
    PartialSummary {
        partial: PaymentsSummary,
        #[source]
        source: ShardErrors,
    },
}

impl ServiceError {
    pub fn is_already_processed(&self) -> bool {
        matches!(self, ServiceError::Router(RouterError::AlreadyProcessed { .. }))
    }
}

#[derive(Clone)]
pub struct PaymentService {
    pub router: Arc<ProcessorRouter>,
    pub store: Arc<ShardedStore>,
}

impl PaymentService {
    pub fn new(router: Arc<ProcessorRouter>, store: Arc<ShardedStore>) -> Self {
        Self { router, store }
    }

    /// Submits upstream, then records the payment under the processor that actually
    /// accepted it. Nothing is written unless the upstream accepted.
    ///
    /// The work runs on its own task, so a caller that goes away after the upstream
    /// accepted cannot keep the record from being written. Dropping the caller while
    /// it still waits for an available processor cancels that wait.
    pub async fn process_payment(
        &self,
        correlation_id: &str,
        amount: f64,
        requested_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Processor, ServiceError> {
        let wait = cancel.child_token();
        let _abandon_wait = wait.clone().drop_guard();

        let service = self.clone();
        let correlation_id = correlation_id.to_string();
        tokio::spawn(async move {
            service
                .submit_and_record(&correlation_id, amount, requested_at, &wait)
                .await
        })
        .await?
    }

    async fn submit_and_record(
        &self,
        correlation_id: &str,
        amount: f64,
        requested_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Processor, ServiceError> {
        let submission = PaymentSubmission::new(correlation_id, amount, requested_at);
        let processor = self.router.submit(&submission, cancel).await?;

        let record = PaymentRecord {
            correlation_id: correlation_id.to_string(),
            amount,
            requested_at,
            processor,
        };
        self.store
            .write(correlation_id, move |conn| {
                Box::pin(async move { PaymentsRepo::insert_payment(conn, &record).await })
            })
            .await
            .inspect_err(|e| {
                tracing::error!(
                    correlation_id,
                    %processor,
                    "payment accepted upstream but not recorded: {}",
                    e
                );
            })?;

        Ok(processor)
    }

    /// Totals over `[from, to)`. A missing `from` is unbounded; a missing `to` means
    /// now. Shards are summarized independently, so the result is not a single
    /// point-in-time snapshot.
    pub async fn summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<PaymentsSummary, ServiceError> {
        let from = from.map(format_range_bound).unwrap_or_default();
        let to = format_range_bound(to.unwrap_or_else(Utc::now));

        let fan_out = self
            .store
            .read_all(|_shard, conn| {
                let (from, to) = (from.clone(), to.clone());
                Box::pin(async move { PaymentsRepo::summarize(conn, &from, &to).await })
            })
            .await;

        let (partials, errors) = fan_out.into_parts();
        let mut total = PaymentsSummary::default();
        for (_, partial) in &partials {
            total.merge(partial);
        }

        match errors {
            Some(source) => Err(ServiceError::PartialSummary {
                partial: total,
                source,
            }),
            None => Ok(total),
        }
    }

    pub async fn find(&self, correlation_id: &str) -> Result<Option<PaymentRecord>, ServiceError> {
        let id = correlation_id.to_string();
        let found = self
            .store
            .read(correlation_id, move |conn| {
                Box::pin(async move { PaymentsRepo::find_payment(conn, &id).await })
            })
            .await?;
        Ok(found)
    }

    /// Removes a recorded payment. Administrative; not used on the submission path.
    pub async fn expunge(&self, correlation_id: &str) -> Result<bool, ServiceError> {
        let id = correlation_id.to_string();
        let removed = self
            .store
            .write(correlation_id, move |conn| {
                Box::pin(async move { PaymentsRepo::expunge_payment(conn, &id).await })
            })
            .await?;
        if removed {
            tracing::info!(correlation_id, "payment expunged");
        }
        Ok(removed)
    }
}
