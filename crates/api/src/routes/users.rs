//! Operator account routes. Creation is admin-only, enforced by the
//! `require_admin` middleware on this router.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use linkwave_shared::UserRole;

use crate::{
    auth::{hash_password, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let (username, password) = match (&req.username, &req.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u.clone(), p.clone()),
        _ => {
            return Err(ApiError::Validation(
                "username and password are required".to_string(),
            ))
        }
    };

    let role = req.role.unwrap_or(UserRole::User);

    let password_hash = hash_password(&password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let user: UserResponse = sqlx::query_as(
        r#"
        INSERT INTO users (username, password_hash, role)
        VALUES ($1, $2, $3)
        RETURNING id, username, role, created_at
        "#,
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "That username already exists"))?;

    tracing::info!(
        username = %user.username,
        role = %user.role,
        created_by = %auth_user.username,
        "Operator account created"
    );

    Ok((StatusCode::CREATED, Json(user)))
}
