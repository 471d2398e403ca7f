//! Public (unauthenticated) routes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    routes::clients::Client,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub dni: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Inbound interest form. Always creates a PROSPECT client, never an
/// active subscriber; an operator activates it later through the client
/// status route.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let (dni, first_name, last_name) = match (&req.dni, &req.first_name, &req.last_name) {
        (Some(d), Some(f), Some(l)) if !d.is_empty() && !f.is_empty() && !l.is_empty() => {
            (d.clone(), f.clone(), l.clone())
        }
        _ => {
            return Err(ApiError::Validation(
                "dni, first_name and last_name are required".to_string(),
            ))
        }
    };

    let client: Client = sqlx::query_as(
        r#"
        INSERT INTO clients (dni, first_name, last_name, phone, email, address, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'PROSPECT')
        RETURNING *
        "#,
    )
    .bind(&dni)
    .bind(&first_name)
    .bind(&last_name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        ApiError::conflict_on_unique(e, "A service request for that DNI already exists")
    })?;

    tracing::info!(client_id = %client.id, "Service request received");

    Ok((StatusCode::CREATED, Json(client)))
}
