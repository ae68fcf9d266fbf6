use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// Ready while at least one upstream processor can take payments.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let router = &state.payment_service.router;
    let ok = router.any_available();
    let status = if ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ok,
            "processors": router.health_snapshot(),
            "shards": state.payment_service.store.shard_count(),
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}

pub async fn processors_health(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        Json(state.payment_service.router.health_snapshot()),
    )
        .into_response()
}
