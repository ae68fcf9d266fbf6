use crate::domain::payment::{ErrorEnvelope, ErrorPayload};
use crate::router::processor_router::RouterError;
use crate::service::payment_service::ServiceError;
use axum::http::StatusCode;
use axum::Json;

pub mod admin;
pub mod ops;
pub mod payments;

pub type ErrorResponse = (StatusCode, Json<ErrorEnvelope>);

pub fn error_response(status: StatusCode, code: &str, message: &str) -> ErrorResponse {
    (
        status,
        Json(ErrorEnvelope {
            error: ErrorPayload {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
            },
        }),
    )
}

/// Maps service failures onto the boundary's status codes. A duplicate is a client
/// conflict rather than a server fault.
pub fn service_error(e: ServiceError) -> ErrorResponse {
    let (status, code) = match &e {
        ServiceError::Router(RouterError::AlreadyProcessed { .. }) => {
            (StatusCode::CONFLICT, "ALREADY_PROCESSED")
        }
        ServiceError::Router(RouterError::Upstream { .. }) => {
            (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILURE")
        }
        ServiceError::Router(RouterError::Cancelled) => {
            (StatusCode::SERVICE_UNAVAILABLE, "NO_PROCESSOR_AVAILABLE")
        }
        ServiceError::Storage(_) | ServiceError::PartialSummary { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        }
        ServiceError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    let (status, Json(mut body)) = error_response(status, code, &e.to_string());
    if let ServiceError::PartialSummary { source, .. } = &e {
        body.error.details = Some(format!("failed shards: {:?}", source.shards()));
    }
    (status, Json(body))
}
