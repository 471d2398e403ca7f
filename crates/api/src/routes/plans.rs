//! Service plan routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use linkwave_shared::PlanCategory;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub bandwidth: String,
    pub monthly_price: Decimal,
    pub category: PlanCategory,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub name: Option<String>,
    pub bandwidth: Option<String>,
    pub monthly_price: Option<Decimal>,
    pub category: Option<PlanCategory>,
    pub active: Option<bool>,
}

#[derive(Debug)]
struct ValidatedPlan {
    name: String,
    bandwidth: String,
    monthly_price: Decimal,
    category: PlanCategory,
    active: bool,
}

fn validate(req: &PlanRequest) -> ApiResult<ValidatedPlan> {
    let (name, bandwidth, monthly_price, category) = match (
        &req.name,
        &req.bandwidth,
        req.monthly_price,
        req.category,
    ) {
        (Some(n), Some(b), Some(p), Some(c)) if !n.is_empty() && !b.is_empty() => {
            (n.clone(), b.clone(), p, c)
        }
        _ => {
            return Err(ApiError::Validation(
                "name, bandwidth, monthly_price and category are required".to_string(),
            ))
        }
    };

    if monthly_price <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "monthly_price must be greater than zero".to_string(),
        ));
    }

    Ok(ValidatedPlan {
        name,
        bandwidth,
        monthly_price,
        category,
        active: req.active.unwrap_or(true),
    })
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Plan>>> {
    let plans: Vec<Plan> = sqlx::query_as("SELECT * FROM plans ORDER BY created_at DESC")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(plans))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Plan>> {
    let plan: Plan = sqlx::query_as("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Plan"))?;

    Ok(Json(plan))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> ApiResult<(StatusCode, Json<Plan>)> {
    let v = validate(&req)?;

    let plan: Plan = sqlx::query_as(
        r#"
        INSERT INTO plans (name, bandwidth, monthly_price, category, active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&v.name)
    .bind(&v.bandwidth)
    .bind(v.monthly_price)
    .bind(v.category)
    .bind(v.active)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PlanRequest>,
) -> ApiResult<Json<Plan>> {
    let v = validate(&req)?;

    let plan: Plan = sqlx::query_as(
        r#"
        UPDATE plans
        SET name = $2, bandwidth = $3, monthly_price = $4, category = $5, active = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&v.name)
    .bind(&v.bandwidth)
    .bind(v.monthly_price)
    .bind(v.category)
    .bind(v.active)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound("Plan"))?;

    Ok(Json(plan))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await;

    match result {
        Ok(r) if r.rows_affected() == 0 => Err(ApiError::NotFound("Plan")),
        Ok(_) => Ok(Json(serde_json::json!({ "message": "Plan deleted" }))),
        Err(e) if ApiError::is_fk_violation(&e) => Err(ApiError::Conflict(
            "Plan is referenced by existing contracts".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn full_request() -> PlanRequest {
        PlanRequest {
            name: Some("Home 50Mb".into()),
            bandwidth: Some("50 Mbps".into()),
            monthly_price: Some(dec!(29.90)),
            category: Some(PlanCategory::Residential),
            active: None,
        }
    }

    #[test]
    fn validation_accepts_complete_request() {
        let v = validate(&full_request()).unwrap();
        assert!(v.active, "active defaults to true");
        assert_eq!(v.monthly_price, dec!(29.90));
    }

    #[test]
    fn validation_rejects_missing_price() {
        let mut req = full_request();
        req.monthly_price = None;
        assert!(matches!(
            validate(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn validation_rejects_non_positive_price() {
        let mut req = full_request();
        req.monthly_price = Some(Decimal::ZERO);
        assert!(matches!(
            validate(&req).unwrap_err(),
            ApiError::Validation(_)
        ));

        req.monthly_price = Some(dec!(-5));
        assert!(matches!(
            validate(&req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
