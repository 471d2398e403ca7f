//! Contract routes.
//!
//! List responses join basic client and plan fields the way the
//! dashboard tables consume them.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use linkwave_billing::{plan_contract_transition, TransitionOutcome};
use linkwave_shared::{BillingCycle, ContractStatus};

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
pub struct Contract {
    pub id: Uuid,
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status: ContractStatus,
    pub billing_cycle: BillingCycle,
    pub payment_method: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Contract joined with client and plan basics for list views.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ContractDetail {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_dni: String,
    pub client_name: String,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub bandwidth: String,
    pub monthly_price: Decimal,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status: ContractStatus,
    pub billing_cycle: BillingCycle,
    pub payment_method: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct ContractRequest {
    pub client_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status: Option<ContractStatus>,
    pub billing_cycle: Option<BillingCycle>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<ContractStatus>,
}

const DETAIL_SELECT: &str = r#"
    SELECT
        c.id,
        c.client_id,
        cl.dni AS client_dni,
        cl.first_name || ' ' || cl.last_name AS client_name,
        c.plan_id,
        p.name AS plan_name,
        p.bandwidth,
        p.monthly_price,
        c.start_date,
        c.end_date,
        c.status,
        c.billing_cycle,
        c.payment_method,
        c.created_at
    FROM contracts c
    JOIN clients cl ON cl.id = c.client_id
    JOIN plans p ON p.id = c.plan_id
"#;

fn require_fields(req: &ContractRequest) -> ApiResult<(Uuid, Uuid, Date)> {
    match (req.client_id, req.plan_id, req.start_date) {
        (Some(client_id), Some(plan_id), Some(start_date)) => Ok((client_id, plan_id, start_date)),
        _ => Err(ApiError::Validation(
            "client_id, plan_id and start_date are required".to_string(),
        )),
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ContractDetail>>> {
    let sql = format!("{DETAIL_SELECT} ORDER BY c.created_at DESC");
    let contracts: Vec<ContractDetail> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;

    Ok(Json(contracts))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ContractDetail>> {
    let sql = format!("{DETAIL_SELECT} WHERE c.id = $1");
    let contract: ContractDetail = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Contract"))?;

    Ok(Json(contract))
}

pub async fn list_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ContractDetail>>> {
    let sql = format!("{DETAIL_SELECT} WHERE c.client_id = $1 ORDER BY c.created_at DESC");
    let contracts: Vec<ContractDetail> = sqlx::query_as(&sql)
        .bind(client_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(contracts))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<ContractRequest>,
) -> ApiResult<(StatusCode, Json<Contract>)> {
    let (client_id, plan_id, start_date) = require_fields(&req)?;

    let contract: Contract = sqlx::query_as(
        r#"
        INSERT INTO contracts (client_id, plan_id, start_date, end_date, status, billing_cycle, payment_method)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(client_id)
    .bind(plan_id)
    .bind(start_date)
    .bind(req.end_date)
    .bind(req.status.unwrap_or(ContractStatus::Pending))
    .bind(req.billing_cycle.unwrap_or(BillingCycle::Monthly))
    .bind(&req.payment_method)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::not_found_on_fk(e, "Referenced client or plan"))?;

    Ok((StatusCode::CREATED, Json(contract)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ContractRequest>,
) -> ApiResult<Json<Contract>> {
    let (client_id, plan_id, start_date) = require_fields(&req)?;

    let contract: Contract = sqlx::query_as(
        r#"
        UPDATE contracts
        SET client_id = $2, plan_id = $3, start_date = $4, end_date = $5,
            billing_cycle = $6, payment_method = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(client_id)
    .bind(plan_id)
    .bind(start_date)
    .bind(req.end_date)
    .bind(req.billing_cycle.unwrap_or(BillingCycle::Monthly))
    .bind(&req.payment_method)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::not_found_on_fk(e, "Referenced client or plan"))?
    .ok_or(ApiError::NotFound("Contract"))?;

    Ok(Json(contract))
}

/// Status-only update, validated against the contract transition table.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Contract>> {
    let target = req
        .status
        .ok_or_else(|| ApiError::Validation("status is required".to_string()))?;

    if query.admin_override && !auth_user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let current: ContractStatus =
        sqlx::query_scalar("SELECT status FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(ApiError::NotFound("Contract"))?;

    match plan_contract_transition(current, target, query.admin_override)? {
        TransitionOutcome::Changed => {
            if query.admin_override {
                tracing::warn!(
                    contract_id = %id,
                    from = ?current,
                    to = ?target,
                    by = %auth_user.username,
                    "Contract status transition forced by administrative override"
                );
            }
            // Cancelling stamps the end date if the caller never set one.
            let contract: Contract = sqlx::query_as(
                r#"
                UPDATE contracts
                SET status = $2,
                    end_date = CASE
                        WHEN $2 = 'CANCELLED'::contract_status AND end_date IS NULL
                        THEN CURRENT_DATE
                        ELSE end_date
                    END
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(target)
            .fetch_one(&state.pool)
            .await?;
            Ok(Json(contract))
        }
        TransitionOutcome::Unchanged => {
            let contract: Contract = sqlx::query_as("SELECT * FROM contracts WHERE id = $1")
                .bind(id)
                .fetch_one(&state.pool)
                .await?;
            Ok(Json(contract))
        }
    }
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await;

    match result {
        Ok(r) if r.rows_affected() == 0 => Err(ApiError::NotFound("Contract")),
        Ok(_) => Ok(Json(serde_json::json!({ "message": "Contract deleted" }))),
        Err(e) if ApiError::is_fk_violation(&e) => Err(ApiError::Conflict(
            "Contract still has invoices".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_client_plan_and_start() {
        let req = ContractRequest {
            client_id: Some(Uuid::new_v4()),
            plan_id: None,
            start_date: None,
            end_date: None,
            status: None,
            billing_cycle: None,
            payment_method: None,
        };
        assert!(matches!(
            require_fields(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
