use crate::domain::payment::{
    format_timestamp, parse_timestamp, PaymentRecord, PaymentsSummary, Processor, ProcessorTotals,
};
use crate::storage::StorageError;
use sqlx::{Row, SqliteConnection};

/// Queries against one shard's `payments` table. Each function runs on the
/// connection of a transaction opened by the storage engine.
pub struct PaymentsRepo;

impl PaymentsRepo {
    pub async fn insert_payment(
        conn: &mut SqliteConnection,
        record: &PaymentRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO payments (correlation_id, amount, requested_at, processor)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(record.correlation_id.as_str())
        .bind(record.amount)
        .bind(format_timestamp(record.requested_at))
        .bind(record.processor.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_payment(
        conn: &mut SqliteConnection,
        correlation_id: &str,
    ) -> Result<Option<PaymentRecord>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT correlation_id, amount, requested_at, processor
            FROM payments
            WHERE correlation_id = ?1
            "#,
        )
        .bind(correlation_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let requested_at: String = r.try_get("requested_at")?;
        let processor: String = r.try_get("processor")?;
        Ok(Some(PaymentRecord {
            correlation_id: r.try_get("correlation_id")?,
            amount: r.try_get("amount")?,
            requested_at: parse_timestamp(&requested_at)
                .ok_or_else(|| StorageError::CorruptRow(format!("requested_at {requested_at:?}")))?,
            processor: Processor::parse(&processor)
                .ok_or_else(|| StorageError::CorruptRow(format!("processor {processor:?}")))?,
        }))
    }

    pub async fn expunge_payment(
        conn: &mut SqliteConnection,
        correlation_id: &str,
    ) -> Result<bool, StorageError> {
        let done = sqlx::query("DELETE FROM payments WHERE correlation_id = ?1")
            .bind(correlation_id)
            .execute(&mut *conn)
            .await?;

        Ok(done.rows_affected() > 0)
    }

    /// Per-processor totals for `from <= requested_at < to`. Both bounds are
    /// formatted timestamps; an empty `from` matches everything before `to`.
    pub async fn summarize(
        conn: &mut SqliteConnection,
        from: &str,
        to: &str,
    ) -> Result<PaymentsSummary, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT processor, COUNT(*) AS total_requests, COALESCE(SUM(amount), 0.0) AS total_amount
            FROM payments
            WHERE requested_at >= ?1 AND requested_at < ?2
            GROUP BY processor
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;

        let mut summary = PaymentsSummary::default();
        for r in rows {
            let name: String = r.try_get("processor")?;
            let Some(processor) = Processor::parse(&name) else {
                tracing::warn!(processor = %name, "ignoring rows for unknown processor");
                continue;
            };
            summary.totals_mut(processor).add(&ProcessorTotals {
                total_requests: r.try_get("total_requests")?,
                total_amount: r.try_get("total_amount")?,
            });
        }

        Ok(summary)
    }

    pub async fn count_payments(conn: &mut SqliteConnection) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}
