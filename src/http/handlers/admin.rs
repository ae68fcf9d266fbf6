use crate::http::handlers::{error_response, service_error};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub async fn expunge_payment(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Response {
    match state.payment_service.expunge(&correlation_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => {
            error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "payment not found").into_response()
        }
        Err(e) => service_error(e).into_response(),
    }
}
