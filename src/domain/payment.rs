use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Processor {
    Default,
    Fallback,
}

impl Processor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Processor::Default => "default",
            Processor::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Processor::Default),
            "fallback" => Some(Processor::Fallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-width RFC 3339 (millisecond precision, `Z` suffix). Every timestamp that
/// reaches storage goes through here so that text ordering matches time ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// 0000-01-01T00:00:00.000Z and 9999-12-31T23:59:59.999Z
const EARLIEST_BOUND_MS: i64 = -62_167_219_200_000;
const LATEST_BOUND_MS: i64 = 253_402_300_799_999;

/// Formats one end of a half-open `[from, to)` summary range.
///
/// Stored timestamps carry whole milliseconds, so a bound with a sub-millisecond
/// part is rounded up: `stored >= from` and `stored < to` then hold for the same
/// rows as with the exact bound. The result is clamped to four-digit years, since
/// chrono writes `+10000-...` past 9999 and that no longer sorts as text.
pub fn format_range_bound(ts: DateTime<Utc>) -> String {
    let mut ms = ts.timestamp_millis();
    if ts.timestamp_subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    let ms = ms.clamp(EARLIEST_BOUND_MS, LATEST_BOUND_MS);
    DateTime::from_timestamp_millis(ms)
        .map(format_timestamp)
        .unwrap_or_default()
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub correlation_id: String,
    pub amount: f64,
    pub requested_at: DateTime<Utc>,
    pub processor: Processor,
}

/// Body forwarded to an upstream processor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
    pub correlation_id: String,
    pub amount: f64,
    pub requested_at: String,
}

impl PaymentSubmission {
    pub fn new(correlation_id: &str, amount: f64, requested_at: DateTime<Utc>) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            amount,
            requested_at: format_timestamp(requested_at),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub correlation_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorTotals {
    pub total_requests: i64,
    pub total_amount: f64,
}

impl ProcessorTotals {
    pub fn add(&mut self, other: &ProcessorTotals) {
        self.total_requests += other.total_requests;
        self.total_amount += other.total_amount;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentsSummary {
    pub default: ProcessorTotals,
    pub fallback: ProcessorTotals,
}

impl PaymentsSummary {
    pub fn totals_mut(&mut self, processor: Processor) -> &mut ProcessorTotals {
        match processor {
            Processor::Default => &mut self.default,
            Processor::Fallback => &mut self.fallback,
        }
    }

    pub fn merge(&mut self, other: &PaymentsSummary) {
        self.default.add(&other.default);
        self.fallback.add(&other.fallback);
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
