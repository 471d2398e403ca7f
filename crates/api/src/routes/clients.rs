//! Client routes.
//!
//! The list endpoint carries each client's computed debt and derived
//! billing status so the dashboard renders standing without a second
//! round trip. The DNI lookup is public: it backs the self-service
//! portal page.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use linkwave_billing::{derive_status, plan_client_transition, BillingStatus, TransitionOutcome};
use linkwave_shared::ClientStatus;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub dni: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: ClientStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Client row joined with its outstanding debt.
#[derive(Debug, sqlx::FromRow)]
struct ClientWithDebtRow {
    id: Uuid,
    dni: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    status: ClientStatus,
    created_at: OffsetDateTime,
    debt: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub client: Client,
    pub debt: Decimal,
    pub billing_status: BillingStatus,
}

impl From<ClientWithDebtRow> for ClientSummary {
    fn from(row: ClientWithDebtRow) -> Self {
        let billing_status = derive_status(row.debt);
        ClientSummary {
            client: Client {
                id: row.id,
                dni: row.dni,
                first_name: row.first_name,
                last_name: row.last_name,
                phone: row.phone,
                email: row.email,
                address: row.address,
                status: row.status,
                created_at: row.created_at,
            },
            debt: row.debt,
            billing_status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub dni: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub dni: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "override", default)]
    pub admin_override: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Serialize)]
pub struct BillingSummaryResponse {
    pub client_id: Uuid,
    pub debt: Decimal,
    pub billing_status: BillingStatus,
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub pending_balance: Decimal,
}

const DUPLICATE_DNI: &str = "A client with that DNI already exists";

fn require_fields(
    dni: &Option<String>,
    first_name: &Option<String>,
    last_name: &Option<String>,
) -> ApiResult<(String, String, String)> {
    match (dni, first_name, last_name) {
        (Some(d), Some(f), Some(l)) if !d.is_empty() && !f.is_empty() && !l.is_empty() => {
            Ok((d.clone(), f.clone(), l.clone()))
        }
        _ => Err(ApiError::Validation(
            "dni, first_name and last_name are required".to_string(),
        )),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List all clients, most recent first, each with computed debt and
/// derived billing status.
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ClientSummary>>> {
    let rows: Vec<ClientWithDebtRow> = sqlx::query_as(
        r#"
        SELECT
            c.id, c.dni, c.first_name, c.last_name, c.phone, c.email,
            c.address, c.status, c.created_at,
            COALESCE(SUM(i.amount) FILTER (WHERE i.status <> 'PAID'), 0) AS debt
        FROM clients c
        LEFT JOIN invoices i ON i.client_id = c.id
        GROUP BY c.id
        ORDER BY c.created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(ClientSummary::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Client>> {
    let client: Client = sqlx::query_as("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Client"))?;

    Ok(Json(client))
}

/// Exact-match lookup by DNI. Public: backs the self-service portal, so
/// the response carries debt and derived billing status.
pub async fn get_by_dni(
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> ApiResult<Json<ClientSummary>> {
    let client: Client = sqlx::query_as("SELECT * FROM clients WHERE dni = $1")
        .bind(dni)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Client"))?;

    let (debt, billing_status) = state.aggregator.billing_status(client.id).await?;

    Ok(Json(ClientSummary {
        client,
        debt,
        billing_status,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let (dni, first_name, last_name) = require_fields(&req.dni, &req.first_name, &req.last_name)?;
    let status = req.status.unwrap_or(ClientStatus::Active);

    let client: Client = sqlx::query_as(
        r#"
        INSERT INTO clients (dni, first_name, last_name, phone, email, address, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&dni)
    .bind(&first_name)
    .bind(&last_name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .bind(status)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, DUPLICATE_DNI))?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> ApiResult<Json<Client>> {
    let (dni, first_name, last_name) = require_fields(&req.dni, &req.first_name, &req.last_name)?;

    let client: Client = sqlx::query_as(
        r#"
        UPDATE clients
        SET dni = $2, first_name = $3, last_name = $4, phone = $5, email = $6, address = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&dni)
    .bind(&first_name)
    .bind(&last_name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, DUPLICATE_DNI))?
    .ok_or(ApiError::NotFound("Client"))?;

    Ok(Json(client))
}

/// Status-only update, validated against the client transition table.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Client>> {
    let target = req
        .status
        .ok_or_else(|| ApiError::Validation("status is required".to_string()))?;

    if query.admin_override && !auth_user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let current: ClientStatus = sqlx::query_scalar("SELECT status FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Client"))?;

    match plan_client_transition(current, target, query.admin_override)? {
        TransitionOutcome::Changed => {
            if query.admin_override {
                tracing::warn!(
                    client_id = %id,
                    from = ?current,
                    to = ?target,
                    by = %auth_user.username,
                    "Client status transition forced by administrative override"
                );
            }
            let client: Client =
                sqlx::query_as("UPDATE clients SET status = $2 WHERE id = $1 RETURNING *")
                    .bind(id)
                    .bind(target)
                    .fetch_one(&state.pool)
                    .await?;
            Ok(Json(client))
        }
        TransitionOutcome::Unchanged => {
            let client: Client = sqlx::query_as("SELECT * FROM clients WHERE id = $1")
                .bind(id)
                .fetch_one(&state.pool)
                .await?;
            Ok(Json(client))
        }
    }
}

/// Debt, derived status, and invoiced-vs-paid totals for one client.
pub async fn billing_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BillingSummaryResponse>> {
    let exists: Option<(bool,)> = sqlx::query_as("SELECT TRUE FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Client"));
    }

    let (debt, billing_status) = state.aggregator.billing_status(id).await?;
    let totals = state.aggregator.compute_totals(id).await?;

    Ok(Json(BillingSummaryResponse {
        client_id: id,
        debt,
        billing_status,
        total_invoiced: totals.total_invoiced,
        total_paid: totals.total_paid,
        pending_balance: totals.pending_balance,
    }))
}

/// Delete a client.
///
/// Default policy is restrict: the delete fails while contracts,
/// invoices, or payments still reference the client. `?cascade=true`
/// (admin only) removes the dependent rows in one transaction,
/// payments first so no step ever orphans a child.
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    if query.cascade {
        if !auth_user.is_admin() {
            return Err(ApiError::Forbidden);
        }

        let mut tx = state.pool.begin().await?;
        sqlx::query("DELETE FROM payments WHERE client_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM invoices WHERE client_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM contracts WHERE client_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted == 0 {
            return Err(ApiError::NotFound("Client"));
        }

        tracing::warn!(client_id = %id, by = %auth_user.username, "Client cascade-deleted");
        return Ok(Json(serde_json::json!({ "message": "Client deleted" })));
    }

    let result = sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await;

    match result {
        Ok(r) if r.rows_affected() == 0 => Err(ApiError::NotFound("Client")),
        Ok(_) => Ok(Json(serde_json::json!({ "message": "Client deleted" }))),
        Err(e) if ApiError::is_fk_violation(&e) => Err(ApiError::Conflict(
            "Client still has contracts, invoices or payments; pass cascade=true to remove them"
                .to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_enforced() {
        let err = require_fields(&None, &Some("Ana".into()), &Some("Vega".into())).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err =
            require_fields(&Some("".into()), &Some("Ana".into()), &Some("Vega".into()))
                .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let ok = require_fields(
            &Some("12345678".into()),
            &Some("Ana".into()),
            &Some("Vega".into()),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn delete_query_defaults_to_restrict() {
        let q: DeleteQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.cascade);
    }

    #[test]
    fn status_query_parses_override() {
        let q: StatusQuery = serde_json::from_str(r#"{"override": true}"#).unwrap();
        assert!(q.admin_override);
        let q: StatusQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.admin_override);
    }
}
