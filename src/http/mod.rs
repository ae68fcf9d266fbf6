use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;

pub mod handlers;
pub mod middleware {
    pub mod admin_auth;
}

pub fn app(state: AppState, admin_key: String) -> Router {
    let admin_routes = Router::new()
        .route(
            "/admin/payments/:correlation_id",
            delete(handlers::admin::expunge_payment),
        )
        .layer(from_fn_with_state(
            admin_key,
            middleware::admin_auth::require_internal_api_key,
        ));

    Router::new()
        .route("/payments", post(handlers::payments::create_payment))
        .route("/payments/:correlation_id", get(handlers::payments::get_payment))
        .route("/payments-summary", get(handlers::payments::payments_summary))
        .route("/processors/health", get(handlers::ops::processors_health))
        .route("/ops/readiness", get(handlers::ops::readiness))
        .route("/ops/liveness", get(handlers::ops::liveness))
        .merge(admin_routes)
        .with_state(state)
}
