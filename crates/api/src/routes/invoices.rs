//! Invoice routes.
//!
//! Invoices link a contract to its (denormalized) client. Creation
//! verifies the client matches the contract's client so the denormalized
//! column can never drift at the write boundary.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use linkwave_billing::{plan_invoice_transition, TransitionOutcome};
use linkwave_shared::InvoiceStatus;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    routes::clients::StatusQuery,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub client_id: Uuid,
    pub period_from: Date,
    pub period_to: Date,
    pub issue_date: Date,
    pub due_date: Date,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Invoice joined with client basics for list views.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InvoiceDetail {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub client_id: Uuid,
    pub client_dni: String,
    pub client_name: String,
    pub period_from: Date,
    pub period_to: Date,
    pub issue_date: Date,
    pub due_date: Date,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    pub contract_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub period_from: Option<Date>,
    pub period_to: Option<Date>,
    pub issue_date: Option<Date>,
    pub due_date: Option<Date>,
    pub amount: Option<Decimal>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug)]
struct ValidatedInvoice {
    contract_id: Uuid,
    client_id: Uuid,
    period_from: Date,
    period_to: Date,
    issue_date: Date,
    due_date: Date,
    amount: Decimal,
}

const DETAIL_SELECT: &str = r#"
    SELECT
        i.id,
        i.contract_id,
        i.client_id,
        cl.dni AS client_dni,
        cl.first_name || ' ' || cl.last_name AS client_name,
        i.period_from,
        i.period_to,
        i.issue_date,
        i.due_date,
        i.amount,
        i.status,
        i.created_at
    FROM invoices i
    JOIN clients cl ON cl.id = i.client_id
"#;

// Billing-date ordering; created_at breaks ties for invoices issued the
// same day.
const DETAIL_ORDER: &str = " ORDER BY i.issue_date DESC, i.created_at DESC";

fn validate(req: &InvoiceRequest) -> ApiResult<ValidatedInvoice> {
    let (contract_id, client_id, period_from, period_to, issue_date, due_date, amount) = match (
        req.contract_id,
        req.client_id,
        req.period_from,
        req.period_to,
        req.issue_date,
        req.due_date,
        req.amount,
    ) {
        (Some(co), Some(cl), Some(pf), Some(pt), Some(iss), Some(due), Some(a)) => {
            (co, cl, pf, pt, iss, due, a)
        }
        _ => {
            return Err(ApiError::Validation(
                "contract_id, client_id, period_from, period_to, issue_date, due_date and amount are required"
                    .to_string(),
            ))
        }
    };

    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    if period_to < period_from {
        return Err(ApiError::Validation(
            "period_to must not precede period_from".to_string(),
        ));
    }

    Ok(ValidatedInvoice {
        contract_id,
        client_id,
        period_from,
        period_to,
        issue_date,
        due_date,
        amount,
    })
}

/// The denormalized client must be the contract's client.
async fn check_contract_client(
    state: &AppState,
    contract_id: Uuid,
    client_id: Uuid,
) -> ApiResult<()> {
    let contract_client: Uuid =
        sqlx::query_scalar("SELECT client_id FROM contracts WHERE id = $1")
            .bind(contract_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(ApiError::NotFound("Contract"))?;

    if contract_client != client_id {
        return Err(ApiError::Validation(
            "client_id does not match the contract's client".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<InvoiceDetail>>> {
    let sql = format!("{DETAIL_SELECT}{DETAIL_ORDER}");
    let invoices: Vec<InvoiceDetail> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;

    Ok(Json(invoices))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvoiceDetail>> {
    let sql = format!("{DETAIL_SELECT} WHERE i.id = $1");
    let invoice: InvoiceDetail = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Invoice"))?;

    Ok(Json(invoice))
}

pub async fn list_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<Json<Vec<InvoiceDetail>>> {
    let sql = format!("{DETAIL_SELECT} WHERE i.client_id = $1{DETAIL_ORDER}");
    let invoices: Vec<InvoiceDetail> = sqlx::query_as(&sql)
        .bind(client_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(invoices))
}

pub async fn list_by_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> ApiResult<Json<Vec<InvoiceDetail>>> {
    let sql = format!("{DETAIL_SELECT} WHERE i.contract_id = $1{DETAIL_ORDER}");
    let invoices: Vec<InvoiceDetail> = sqlx::query_as(&sql)
        .bind(contract_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(invoices))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<InvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let v = validate(&req)?;
    check_contract_client(&state, v.contract_id, v.client_id).await?;

    let invoice: Invoice = sqlx::query_as(
        r#"
        INSERT INTO invoices
            (contract_id, client_id, period_from, period_to, issue_date, due_date, amount, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(v.contract_id)
    .bind(v.client_id)
    .bind(v.period_from)
    .bind(v.period_to)
    .bind(v.issue_date)
    .bind(v.due_date)
    .bind(v.amount)
    .bind(req.status.unwrap_or(InvoiceStatus::Pending))
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::not_found_on_fk(e, "Referenced contract or client"))?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<InvoiceRequest>,
) -> ApiResult<Json<Invoice>> {
    let v = validate(&req)?;
    check_contract_client(&state, v.contract_id, v.client_id).await?;

    let invoice: Invoice = sqlx::query_as(
        r#"
        UPDATE invoices
        SET contract_id = $2, client_id = $3, period_from = $4, period_to = $5,
            issue_date = $6, due_date = $7, amount = $8
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(v.contract_id)
    .bind(v.client_id)
    .bind(v.period_from)
    .bind(v.period_to)
    .bind(v.issue_date)
    .bind(v.due_date)
    .bind(v.amount)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::not_found_on_fk(e, "Referenced contract or client"))?
    .ok_or(ApiError::NotFound("Invoice"))?;

    Ok(Json(invoice))
}

/// Status-only update, validated against the invoice transition table.
///
/// Setting PAID on an already-PAID invoice is an idempotent success.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Invoice>> {
    let target = req
        .status
        .ok_or_else(|| ApiError::Validation("status is required".to_string()))?;

    if query.admin_override && !auth_user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let current: InvoiceStatus = sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Invoice"))?;

    match plan_invoice_transition(current, target, query.admin_override)? {
        TransitionOutcome::Changed => {
            if query.admin_override {
                tracing::warn!(
                    invoice_id = %id,
                    from = ?current,
                    to = ?target,
                    by = %auth_user.username,
                    "Invoice status transition forced by administrative override"
                );
            }
            let invoice: Invoice =
                sqlx::query_as("UPDATE invoices SET status = $2 WHERE id = $1 RETURNING *")
                    .bind(id)
                    .bind(target)
                    .fetch_one(&state.pool)
                    .await?;
            Ok(Json(invoice))
        }
        TransitionOutcome::Unchanged => {
            let invoice: Invoice = sqlx::query_as("SELECT * FROM invoices WHERE id = $1")
                .bind(id)
                .fetch_one(&state.pool)
                .await?;
            Ok(Json(invoice))
        }
    }
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await;

    match result {
        Ok(r) if r.rows_affected() == 0 => Err(ApiError::NotFound("Invoice")),
        Ok(_) => Ok(Json(serde_json::json!({ "message": "Invoice deleted" }))),
        Err(e) if ApiError::is_fk_violation(&e) => Err(ApiError::Conflict(
            "Invoice still has payments".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn full_request() -> InvoiceRequest {
        InvoiceRequest {
            contract_id: Some(Uuid::new_v4()),
            client_id: Some(Uuid::new_v4()),
            period_from: Some(date!(2025 - 01 - 01)),
            period_to: Some(date!(2025 - 01 - 31)),
            issue_date: Some(date!(2025 - 02 - 01)),
            due_date: Some(date!(2025 - 02 - 15)),
            amount: Some(dec!(100)),
            status: None,
        }
    }

    #[test]
    fn validation_accepts_complete_request() {
        assert!(validate(&full_request()).is_ok());
    }

    #[test]
    fn validation_rejects_missing_dates() {
        let mut req = full_request();
        req.due_date = None;
        assert!(matches!(
            validate(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn validation_rejects_non_positive_amount() {
        let mut req = full_request();
        req.amount = Some(Decimal::ZERO);
        assert!(matches!(
            validate(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn validation_rejects_inverted_period() {
        let mut req = full_request();
        req.period_from = Some(date!(2025 - 02 - 01));
        req.period_to = Some(date!(2025 - 01 - 01));
        assert!(matches!(
            validate(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
