//! Login route.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linkwave_shared::UserRole;

use crate::{
    auth::verify_password,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserIdentity,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: UserRole,
}

/// Unknown username and wrong password produce the same message so the
/// endpoint cannot be used to enumerate accounts.
const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (username, password) = match (&req.username, &req.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => {
            return Err(ApiError::Validation(
                "username and password are required".to_string(),
            ))
        }
    };

    let user: Option<UserRow> = sqlx::query_as(
        "SELECT id, username, password_hash, role FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(&state.pool)
    .await?;

    let user = match user {
        Some(u) if verify_password(password, &u.password_hash) => u,
        _ => {
            tracing::warn!(username = %username, "Failed login attempt");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
        }
    };

    let token = state
        .jwt_manager
        .generate_token(user.id, &user.username, user.role)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to sign token");
            ApiError::Internal
        })?;

    tracing::info!(username = %user.username, role = %user.role, "Login successful");

    Ok(Json(LoginResponse {
        token,
        user: UserIdentity {
            id: user.id,
            username: user.username,
            role: user.role,
        },
    }))
}
