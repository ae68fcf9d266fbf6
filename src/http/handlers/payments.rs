use crate::domain::payment::{parse_timestamp, CreatePaymentRequest, SummaryQuery};
use crate::http::handlers::{error_response, service_error, ErrorResponse};
use crate::router::processor_router::RouterError;
use crate::service::payment_service::ServiceError;
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};

pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_BODY",
                &rejection.body_text(),
            )
            .into_response()
        }
    };
    let correlation_id = match validate_request(&req) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let cancel = state.shutdown.child_token();
    let deadline = state.payment_wait_timeout.map(|limit| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            cancel.cancel();
        })
    });

    let result = state
        .payment_service
        .process_payment(&correlation_id, req.amount, Utc::now(), &cancel)
        .await;
    if let Some(timer) = deadline {
        timer.abort();
    }

    match result {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            if matches!(e, ServiceError::Router(RouterError::Cancelled)) {
                tracing::warn!(%correlation_id, "no processor became available in time");
            }
            service_error(e).into_response()
        }
    }
}

pub async fn payments_summary(
    State(state): State<AppState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(q)) => q,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_QUERY",
                &rejection.body_text(),
            )
            .into_response()
        }
    };

    let from = match timestamp_param("from", query.from.as_deref()) {
        Ok(ts) => ts,
        Err(e) => return e.into_response(),
    };
    let to = match timestamp_param("to", query.to.as_deref()) {
        Ok(ts) => ts,
        Err(e) => return e.into_response(),
    };

    match state.payment_service.summary(from, to).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            tracing::error!("payments summary failed: {}", e);
            service_error(e).into_response()
        }
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Response {
    match state.payment_service.find(&correlation_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => {
            error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "payment not found").into_response()
        }
        Err(e) => service_error(e).into_response(),
    }
}

/// Trims the correlation id and checks it is a UUID; the amount must be a
/// positive finite number.
fn validate_request(req: &CreatePaymentRequest) -> Result<String, ErrorResponse> {
    let correlation_id = req.correlation_id.trim();
    if correlation_id.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CORRELATION_ID",
            "correlationId is required",
        ));
    }
    if uuid::Uuid::parse_str(correlation_id).is_err() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CORRELATION_ID",
            "correlationId must be a uuid",
        ));
    }
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_AMOUNT",
            "amount must be positive",
        ));
    }
    Ok(correlation_id.to_string())
}

fn timestamp_param(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ErrorResponse> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_timestamp(s).map(Some).ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_TIMESTAMP",
                &format!("invalid time format in '{name}'"),
            )
        }),
    }
}
