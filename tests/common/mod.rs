#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use payments_relay::domain::payment::PaymentRecord;
use payments_relay::gateways::http_processor::HttpProcessor;
use payments_relay::router::processor_router::{ProcessorRouter, RouterConfig};
use payments_relay::service::payment_service::PaymentService;
use payments_relay::storage::{ShardedStore, MIGRATOR};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Stand-in for an upstream payment processor speaking the real HTTP contract.
#[derive(Clone, Default)]
pub struct StubProcessor {
    pub failing: Arc<AtomicBool>,
    pub reject_all: Arc<AtomicBool>,
    pub accepted: Arc<AtomicUsize>,
    pub submit_delay_ms: Arc<AtomicU64>,
    seen: Arc<Mutex<HashSet<String>>>,
}

impl StubProcessor {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays the response to every accepted submission.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.submit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/payments", post(stub_submit))
            .route("/payments/service-health", get(stub_health))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

async fn stub_submit(
    State(stub): State<StubProcessor>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    if stub.reject_all.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let id = body["correlationId"].as_str().unwrap_or_default().to_string();
    assert!(body["requestedAt"].as_str().is_some(), "requestedAt missing");
    if !stub.seen.lock().unwrap().insert(id) {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    stub.accepted.fetch_add(1, Ordering::SeqCst);
    let delay = stub.submit_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    StatusCode::OK
}

async fn stub_health(State(stub): State<StubProcessor>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "failing": stub.failing.load(Ordering::SeqCst),
        "minResponseTime": 5
    }))
}

pub struct Harness {
    pub service: PaymentService,
    pub router: Arc<ProcessorRouter>,
    pub store: Arc<ShardedStore>,
    pub default: StubProcessor,
    pub fallback: StubProcessor,
    pub shutdown: CancellationToken,
    _dir: TempDir,
}

impl Harness {
    pub async fn start(shards: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("payments");
        let store = Arc::new(
            ShardedStore::open(base.to_str().unwrap(), shards, &MIGRATOR, 2)
                .await
                .unwrap(),
        );

        let default = StubProcessor::default();
        let fallback = StubProcessor::default();
        let default_url = default.spawn().await;
        let fallback_url = fallback.spawn().await;

        let router = Arc::new(ProcessorRouter::new(
            Arc::new(HttpProcessor::new(&default_url, 2_000, 500).unwrap()),
            Arc::new(HttpProcessor::new(&fallback_url, 2_000, 500).unwrap()),
            RouterConfig {
                health_poll_interval: Duration::from_millis(20),
                fallback_first_poll_delay: Duration::ZERO,
                availability_recheck: Duration::from_millis(10),
            },
        ));
        let shutdown = CancellationToken::new();
        router.spawn_health_pollers(shutdown.clone());

        let harness = Self {
            service: PaymentService::new(router.clone(), store.clone()),
            router,
            store,
            default,
            fallback,
            shutdown,
            _dir: dir,
        };
        harness
            .wait_until(|r| r.is_available(payments_relay::domain::payment::Processor::Default))
            .await;
        harness
    }

    /// Polls storage until `correlation_id` is recorded.
    pub async fn wait_for_record(&self, correlation_id: &str) -> PaymentRecord {
        for _ in 0..300 {
            if let Some(record) = self.service.find(correlation_id).await.unwrap() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("payment {correlation_id} was never recorded");
    }

    pub async fn wait_until(&self, cond: impl Fn(&ProcessorRouter) -> bool) {
        for _ in 0..300 {
            if cond(&self.router) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("router never reached the expected health state");
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
