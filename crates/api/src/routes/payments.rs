//! Payment routes.
//!
//! Creating a payment goes through the billing settlement path: the
//! payment row and any resulting PAID transition on its invoice commit in
//! one transaction (see `linkwave_billing::settlement`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use linkwave_billing::{record_payment, NewPayment, Payment, SettlementOutcome};
use linkwave_shared::ReceiptKind;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Payment joined with client and receipt basics for list views.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PaymentDetail {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub client_dni: String,
    pub client_name: String,
    pub payment_date: Date,
    pub amount: Decimal,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub receipt_id: Option<Uuid>,
    pub receipt_path: Option<String>,
    pub receipt_kind: Option<ReceiptKind>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub invoice_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub payment_date: Option<Date>,
    pub amount: Option<Decimal>,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub receipt_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    #[serde(flatten)]
    pub payment: Payment,
    /// What settlement did to the invoice: INVOICE_SETTLED,
    /// PARTIALLY_PAID, or ALREADY_SETTLED.
    pub settlement: SettlementOutcome,
}

const DETAIL_SELECT: &str = r#"
    SELECT
        p.id,
        p.invoice_id,
        p.client_id,
        cl.dni AS client_dni,
        cl.first_name || ' ' || cl.last_name AS client_name,
        p.payment_date,
        p.amount,
        p.method,
        p.reference,
        p.receipt_id,
        r.file_path AS receipt_path,
        r.kind AS receipt_kind,
        p.created_at
    FROM payments p
    JOIN clients cl ON cl.id = p.client_id
    LEFT JOIN receipts r ON r.id = p.receipt_id
"#;

const DETAIL_ORDER: &str = " ORDER BY p.payment_date DESC, p.created_at DESC";

fn require_fields(req: &PaymentRequest) -> ApiResult<(Uuid, Uuid, Date, Decimal)> {
    match (req.invoice_id, req.client_id, req.payment_date, req.amount) {
        (Some(invoice_id), Some(client_id), Some(date), Some(amount)) => {
            Ok((invoice_id, client_id, date, amount))
        }
        _ => Err(ApiError::Validation(
            "invoice_id, client_id, payment_date and amount are required".to_string(),
        )),
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<PaymentDetail>>> {
    let sql = format!("{DETAIL_SELECT}{DETAIL_ORDER}");
    let payments: Vec<PaymentDetail> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;

    Ok(Json(payments))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentDetail>> {
    let sql = format!("{DETAIL_SELECT} WHERE p.id = $1");
    let payment: PaymentDetail = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Payment"))?;

    Ok(Json(payment))
}

pub async fn list_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PaymentDetail>>> {
    let sql = format!("{DETAIL_SELECT} WHERE p.client_id = $1{DETAIL_ORDER}");
    let payments: Vec<PaymentDetail> = sqlx::query_as(&sql)
        .bind(client_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(payments))
}

pub async fn list_by_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PaymentDetail>>> {
    let sql = format!("{DETAIL_SELECT} WHERE p.invoice_id = $1{DETAIL_ORDER}");
    let payments: Vec<PaymentDetail> = sqlx::query_as(&sql)
        .bind(invoice_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(payments))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<CreatePaymentResponse>)> {
    let (invoice_id, client_id, payment_date, amount) = require_fields(&req)?;

    let (payment, settlement) = record_payment(
        &state.pool,
        NewPayment {
            invoice_id,
            client_id,
            payment_date,
            amount,
            method: req.method,
            reference: req.reference,
            receipt_id: req.receipt_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            payment,
            settlement,
        }),
    ))
}

/// Update a payment's descriptive fields.
///
/// Amount and invoice linkage are settlement inputs and cannot be edited
/// in place; delete and re-record instead.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<Payment>> {
    let payment_date = req
        .payment_date
        .ok_or_else(|| ApiError::Validation("payment_date is required".to_string()))?;

    let payment: Payment = sqlx::query_as(
        r#"
        UPDATE payments
        SET payment_date = $2, method = $3, reference = $4, receipt_id = $5
        WHERE id = $1
        RETURNING id, invoice_id, client_id, payment_date, amount, method, reference, receipt_id, created_at
        "#,
    )
    .bind(id)
    .bind(payment_date)
    .bind(&req.method)
    .bind(&req.reference)
    .bind(req.receipt_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::not_found_on_fk(e, "Referenced receipt"))?
    .ok_or(ApiError::NotFound("Payment"))?;

    Ok(Json(payment))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("Payment"));
    }
    Ok(Json(serde_json::json!({ "message": "Payment deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    #[test]
    fn create_requires_all_settlement_inputs() {
        let req = PaymentRequest {
            invoice_id: Some(Uuid::new_v4()),
            client_id: Some(Uuid::new_v4()),
            payment_date: Some(date!(2025 - 03 - 01)),
            amount: None,
            method: None,
            reference: None,
            receipt_id: None,
        };
        assert!(matches!(
            require_fields(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn complete_request_passes() {
        let req = PaymentRequest {
            invoice_id: Some(Uuid::new_v4()),
            client_id: Some(Uuid::new_v4()),
            payment_date: Some(date!(2025 - 03 - 01)),
            amount: Some(dec!(50)),
            method: Some("CASH".into()),
            reference: None,
            receipt_id: None,
        };
        assert!(require_fields(&req).is_ok());
    }
}
