mod common;

use common::Harness;
use payments_relay::http::middleware::admin_auth::INTERNAL_API_KEY_HEADER;
use payments_relay::AppState;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ADMIN_KEY: &str = "test-admin-key";
const ID: &str = "11111111-1111-1111-1111-111111111111";

async fn serve(h: &Harness) -> String {
    serve_with(h, Some(Duration::from_millis(200)), CancellationToken::new()).await
}

async fn serve_with(
    h: &Harness,
    payment_wait_timeout: Option<Duration>,
    shutdown: CancellationToken,
) -> String {
    let state = AppState {
        payment_service: h.service.clone(),
        payment_wait_timeout,
        shutdown,
    };
    let app = payments_relay::http::app(state, ADMIN_KEY.to_string());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submit_then_summarize() {
    let h = Harness::start(4).await;
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/payments"))
        .json(&json!({"correlationId": ID, "amount": 19.90}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().is_empty());

    let dup = client
        .post(format!("{base}/payments"))
        .json(&json!({"correlationId": ID, "amount": 19.90}))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), 409);
    let body: Value = dup.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ALREADY_PROCESSED");

    let summary: Value = client
        .get(format!("{base}/payments-summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["default"]["totalRequests"], 1);
    assert_eq!(summary["default"]["totalAmount"], 19.90);
    assert_eq!(summary["fallback"]["totalRequests"], 0);

    let record: Value = client
        .get(format!("{base}/payments/{ID}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["processor"], "default");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalid_input_is_rejected() {
    let h = Harness::start(2).await;
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    for body in [
        json!({"correlationId": "nope", "amount": 1.0}),
        json!({"correlationId": ID, "amount": 0}),
        json!({"correlationId": ID}),
    ] {
        let resp = client.post(format!("{base}/payments")).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 400, "body {body}");
    }

    let resp = client
        .get(format!("{base}/payments-summary?from=yesterday"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(h.default.accepted(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_turns_an_outage_into_503() {
    let h = Harness::start(2).await;
    let base = serve(&h).await;
    h.default.set_failing(true);
    h.fallback.set_failing(true);
    h.wait_until(|r| !r.any_available()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/payments"))
        .json(&json!({"correlationId": ID, "amount": 3.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);

    let ready = reqwest::get(format!("{base}/ops/readiness")).await.unwrap();
    assert_eq!(ready.status(), 503);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expunge_requires_the_admin_key() {
    let h = Harness::start(2).await;
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/payments"))
        .json(&json!({"correlationId": ID, "amount": 2.0}))
        .send()
        .await
        .unwrap();

    let denied = client
        .delete(format!("{base}/admin/payments/{ID}"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let removed = client
        .delete(format!("{base}/admin/payments/{ID}"))
        .header(INTERNAL_API_KEY_HEADER, ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), 204);

    let missing = client.get(format!("{base}/payments/{ID}")).send().await.unwrap();
    assert_eq!(missing.status(), 404);

    let health: Value = client
        .get(format!("{base}/processors/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health[0]["processor"], "default");
    assert_eq!(health[0]["available"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn client_timeout_does_not_lose_an_accepted_payment() {
    let h = Harness::start(2).await;
    let base = serve(&h).await;
    h.default.set_submit_delay(Duration::from_millis(300));

    let gave_up = reqwest::Client::new()
        .post(format!("{base}/payments"))
        .json(&json!({"correlationId": ID, "amount": 4.2}))
        .timeout(Duration::from_millis(100))
        .send()
        .await
        .unwrap_err();
    assert!(gave_up.is_timeout());

    let record = h.wait_for_record(ID).await;
    assert_eq!(record.amount, 4.2);
    assert_eq!(h.default.accepted(), 1);

    let summary: Value = reqwest::get(format!("{base}/payments-summary"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["default"]["totalRequests"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_releases_requests_waiting_on_an_outage() {
    let h = Harness::start(2).await;
    let shutdown = CancellationToken::new();
    let base = serve_with(&h, None, shutdown.clone()).await;
    h.default.set_failing(true);
    h.fallback.set_failing(true);
    h.wait_until(|r| !r.any_available()).await;

    let pending = tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("{base}/payments"))
            .json(&json!({"correlationId": ID, "amount": 3.0}))
            .send()
            .await
            .unwrap()
            .status()
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!pending.is_finished());

    shutdown.cancel();
    let status = tokio::time::timeout(Duration::from_secs(2), pending)
        .await
        .expect("request should end once shutdown starts")
        .unwrap();
    assert_eq!(status, 503);
    assert_eq!(h.default.accepted() + h.fallback.accepted(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn summary_with_a_failed_shard_is_a_storage_error() {
    let h = Harness::start(4).await;
    let base = serve(&h).await;
    let broken = h.store.shard_for(ID);

    h.store
        .write(ID, |conn| {
            Box::pin(async move {
                sqlx::query("DROP TABLE payments").execute(&mut *conn).await?;
                Ok::<_, payments_relay::storage::StorageError>(())
            })
        })
        .await
        .unwrap();

    let resp = reqwest::get(format!("{base}/payments-summary")).await.unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "STORAGE_ERROR");
    assert_eq!(body["error"]["details"], format!("failed shards: [{broken}]"));
}
