//! Startup initialization.

use sqlx::PgPool;

use crate::auth::hash_password;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Seed the configured admin account if it does not exist yet.
///
/// Idempotent and invoked exactly once at process start; keyed on the
/// username so a restart never re-creates or overwrites the account.
pub async fn seed_admin(pool: &PgPool, config: &Config) -> ApiResult<()> {
    let exists: Option<(bool,)> = sqlx::query_as("SELECT TRUE FROM users WHERE username = $1")
        .bind(&config.admin_username)
        .fetch_optional(pool)
        .await?;

    if exists.is_some() {
        tracing::info!(username = %config.admin_username, "Admin account present, skipping seed");
        return Ok(());
    }

    let password_hash = hash_password(&config.admin_password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash seed admin password");
        ApiError::Internal
    })?;

    sqlx::query("INSERT INTO users (username, password_hash, role) VALUES ($1, $2, 'ADMIN')")
        .bind(&config.admin_username)
        .bind(&password_hash)
        .execute(pool)
        .await?;

    tracing::warn!(
        username = %config.admin_username,
        "Seeded admin account with the configured default credential - rotate it before going live"
    );

    Ok(())
}
