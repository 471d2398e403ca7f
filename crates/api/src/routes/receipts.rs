//! Receipt (proof-of-payment) routes.
//!
//! Uploads are synchronous: the file is fully written to disk before the
//! row is inserted. Deletion removes the row first - that is the
//! ownership-transferring step - then enqueues the file unlink in
//! `receipt_cleanup`, attempting it once inline so the common case needs
//! no worker pass. A failed unlink never fails the request.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use linkwave_shared::ReceiptKind;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Receipt {
    pub id: Uuid,
    /// Public path the file is served from (`/uploads/receipts/...`)
    pub file_path: String,
    /// Original filename as uploaded
    pub file_name: Option<String>,
    pub kind: Option<ReceiptKind>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Collected multipart fields.
struct Upload {
    data: Vec<u8>,
    original_name: String,
    kind: Option<ReceiptKind>,
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    let mut data: Option<(Vec<u8>, String)> = None;
    let mut kind: Option<ReceiptKind> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original_name = field
                    .file_name()
                    .unwrap_or("receipt")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read file: {e}")))?;
                data = Some((bytes.to_vec(), original_name));
            }
            Some("kind") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read kind: {e}")))?;
                if !text.is_empty() {
                    kind = Some(text.parse().map_err(|_| {
                        ApiError::Validation(
                            "kind must be one of WALLET_TRANSFER, BANK_DEPOSIT, BANK_TRANSFER"
                                .to_string(),
                        )
                    })?);
                }
            }
            _ => {}
        }
    }

    let (data, original_name) =
        data.ok_or_else(|| ApiError::Validation("a \"file\" part is required".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("uploaded file is empty".to_string()));
    }

    Ok(Upload {
        data,
        original_name,
        kind,
    })
}

/// Timestamped stored filename; whitespace collapsed to dashes and path
/// separators stripped so the name can never escape the upload dir.
fn stored_filename(original: &str, timestamp: i64) -> String {
    let safe: String = original
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                '-'
            } else if c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{timestamp}-{safe}")
}

fn disk_path(upload_dir: &str, public_path: &str) -> String {
    let filename = public_path.rsplit('/').next().unwrap_or(public_path);
    format!("{upload_dir}/{filename}")
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Receipt>)> {
    let upload = read_upload(multipart).await?;

    let filename = stored_filename(
        &upload.original_name,
        OffsetDateTime::now_utc().unix_timestamp(),
    );
    let disk = format!("{}/{}", state.config.upload_dir, filename);
    let public_path = format!("/uploads/receipts/{filename}");

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, dir = %state.config.upload_dir, "Failed to create upload dir");
            ApiError::Internal
        })?;
    tokio::fs::write(&disk, &upload.data).await.map_err(|e| {
        tracing::error!(error = %e, path = %disk, "Failed to write receipt file");
        ApiError::Internal
    })?;

    let receipt: Receipt = sqlx::query_as(
        r#"
        INSERT INTO receipts (file_path, file_name, kind)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&public_path)
    .bind(&upload.original_name)
    .bind(upload.kind)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(receipt_id = %receipt.id, path = %public_path, "Receipt uploaded");

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Receipt>>> {
    let receipts: Vec<Receipt> =
        sqlx::query_as("SELECT * FROM receipts ORDER BY created_at DESC")
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(receipts))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Receipt>> {
    let receipt: Receipt = sqlx::query_as("SELECT * FROM receipts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Receipt"))?;

    Ok(Json(receipt))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let receipt: Receipt = sqlx::query_as("SELECT * FROM receipts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Receipt"))?;

    let disk = disk_path(&state.config.upload_dir, &receipt.file_path);

    // Row delete and cleanup enqueue commit together; the file unlink is
    // attempted afterwards and tolerated to fail.
    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM receipts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let cleanup_id: Uuid =
        sqlx::query_scalar("INSERT INTO receipt_cleanup (file_path) VALUES ($1) RETURNING id")
            .bind(&disk)
            .fetch_one(&mut *tx)
            .await?;
    tx.commit().await?;

    match tokio::fs::remove_file(&disk).await {
        Ok(()) => {
            sqlx::query("DELETE FROM receipt_cleanup WHERE id = $1")
                .bind(cleanup_id)
                .execute(&state.pool)
                .await?;
        }
        Err(e) => {
            tracing::warn!(
                receipt_id = %id,
                path = %disk,
                error = %e,
                "Could not remove receipt file now; left for the cleanup worker"
            );
        }
    }

    Ok(Json(serde_json::json!({ "message": "Receipt deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_filename_is_timestamped_and_safe() {
        assert_eq!(
            stored_filename("my receipt.pdf", 1700000000),
            "1700000000-my-receipt.pdf"
        );
        assert_eq!(
            stored_filename("../../etc/passwd", 1700000000),
            "1700000000-.._.._etc_passwd"
        );
    }

    #[test]
    fn disk_path_strips_public_prefix() {
        assert_eq!(
            disk_path("uploads/receipts", "/uploads/receipts/170-x.pdf"),
            "uploads/receipts/170-x.pdf"
        );
    }
}
