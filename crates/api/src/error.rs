//! API error taxonomy and response mapping.
//!
//! Every handler returns `ApiResult<T>`; failures map onto one JSON
//! envelope `{"error": ..., "code": ...}` with conventional status codes.
//! Unique-constraint violations are surfaced as a distinct conflict
//! message, not a generic failure, so callers can tell "already exists"
//! apart from bad input.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use linkwave_billing::BillingError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("illegal status transition: {0}")]
    IllegalTransition(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("forbidden")]
    Forbidden,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    /// Map a store error from an insert/update, turning a unique-key
    /// violation (Postgres 23505) into a conflict with a caller-facing
    /// message.
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.code().as_deref() == Some("23505") {
                return ApiError::Conflict(message.to_string());
            }
        }
        ApiError::Database(err)
    }

    /// Map a store error from an insert/update that binds foreign keys,
    /// turning an FK violation (Postgres 23503) into a referenced-row
    /// not-found.
    pub fn not_found_on_fk(err: sqlx::Error, what: &'static str) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.code().as_deref() == Some("23503") {
                return ApiError::NotFound(what);
            }
        }
        ApiError::Database(err)
    }

    /// Whether a delete failed because children still reference the row.
    pub fn is_fk_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db| db.code())
            .as_deref()
            == Some("23503")
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Database(e) => ApiError::Database(e),
            BillingError::InvoiceNotFound => ApiError::NotFound("Invoice"),
            BillingError::ClientNotFound => ApiError::NotFound("Client"),
            BillingError::AmountNotPositive => {
                ApiError::Validation("amount must be greater than zero".to_string())
            }
            BillingError::PaymentClientMismatch => ApiError::Validation(
                "payment client does not match the invoice's client".to_string(),
            ),
            e @ (BillingError::IllegalInvoiceTransition { .. }
            | BillingError::IllegalContractTransition { .. }
            | BillingError::IllegalClientTransition { .. }) => {
                ApiError::IllegalTransition(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::IllegalTransition(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::Database(e) => {
                tracing::error!(error = %e, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_transition_error_maps_to_bad_request() {
        use linkwave_shared::InvoiceStatus;
        let err: ApiError = BillingError::IllegalInvoiceTransition {
            from: InvoiceStatus::Paid,
            to: InvoiceStatus::Pending,
        }
        .into();
        assert!(matches!(err, ApiError::IllegalTransition(_)));
    }

    #[test]
    fn billing_not_found_maps_to_not_found() {
        let err: ApiError = BillingError::InvoiceNotFound.into();
        assert!(matches!(err, ApiError::NotFound("Invoice")));
    }

    #[test]
    fn row_not_found_is_distinct_from_other_store_errors() {
        let err: ApiError = BillingError::AmountNotPositive.into();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
