//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Order workflow error.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, record_id) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Fulfillment(err) => {
                let record_id = err.record_id();
                let (status, kind, message) = fulfillment_error_to_response(err);
                (status, kind, message, record_id)
            }
        };

        let mut body = serde_json::json!({ "error": message, "kind": kind });
        if let Some(record_id) = record_id {
            body["record_id"] = serde_json::json!(record_id);
        }
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, &'static str, String) {
    match &err {
        FulfillmentError::OrderNotFound(_)
        | FulfillmentError::ProductNotFound(_)
        | FulfillmentError::CompensationNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        FulfillmentError::ProductNotAvailable(_)
        | FulfillmentError::InsufficientStock { .. }
        | FulfillmentError::OrderCanceled(_) => {
            tracing::warn!(error = %err, "business rule rejected request");
            (StatusCode::CONFLICT, "business_rule", err.to_string())
        }
        FulfillmentError::CompensationOutstanding { .. }
        | FulfillmentError::CompensationMismatch { .. } => {
            tracing::warn!(error = %err, "compensation blocks request");
            (StatusCode::CONFLICT, "compensation_outstanding", err.to_string())
        }
        FulfillmentError::StockConflict(_) => {
            (StatusCode::CONFLICT, "stock_conflict", err.to_string())
        }
        FulfillmentError::InvalidOrder(_) => {
            (StatusCode::BAD_REQUEST, "bad_request", err.to_string())
        }
        FulfillmentError::InventoryCommunication(_) => {
            tracing::error!(error = %err, "inventory service unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "inventory_unavailable",
                "Inventory service unavailable".to_string(),
            )
        }
        FulfillmentError::FatalCompensation { record_id, .. } => {
            tracing::error!(
                %record_id,
                error = %err,
                "compensation failed; operator action required"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "fatal_compensation",
                err.to_string(),
            )
        }
        FulfillmentError::OrderOutOfSync { record_id, .. } => {
            tracing::error!(
                %record_id,
                error = %err,
                "order not updated after stock release; retry the compensation"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "order_out_of_sync",
                err.to_string(),
            )
        }
        FulfillmentError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}
