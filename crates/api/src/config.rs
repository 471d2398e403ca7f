//! Environment configuration.

/// Runtime configuration, loaded once at startup.
///
/// Every value can come from the environment; the fallbacks exist so a
/// dev checkout runs with nothing but a database, and the insecure ones
/// log a warning so they cannot silently reach production.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Direct (non-pooled) URL for migrations; falls back to `database_url`.
    pub database_direct_url: Option<String>,
    pub bind_address: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub admin_username: String,
    pub admin_password: String,
    /// Directory receipt files are written to.
    pub upload_dir: String,
    pub allowed_origins: Vec<String>,
}

const DEV_JWT_SECRET: &str = "linkwave-dev-secret";
const DEV_ADMIN_PASSWORD: &str = "admin123";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/linkwave".to_string());

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set - using insecure development secret, rotate before production"
                );
                DEV_JWT_SECRET.to_string()
            }
        };

        let admin_password = match std::env::var("ADMIN_PASSWORD") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "ADMIN_PASSWORD not set - seeded admin uses the default credential, rotate before production"
                );
                DEV_ADMIN_PASSWORD.to_string()
            }
        };

        let jwt_expiry_hours = std::env::var("JWT_EXPIRY_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            database_direct_url: std::env::var("DATABASE_DIRECT_URL").ok(),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:4000".to_string()),
            jwt_secret,
            jwt_expiry_hours,
            admin_username: std::env::var("ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password,
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads/receipts".to_string()),
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_has_dev_fallbacks() {
        // Only asserts the fallback shape; env vars set by the harness
        // would override individual fields.
        let config = Config::from_env().unwrap();
        assert!(!config.bind_address.is_empty());
        assert!(config.jwt_expiry_hours > 0);
        assert!(!config.upload_dir.is_empty());
        assert!(!config.allowed_origins.is_empty());
    }
}
