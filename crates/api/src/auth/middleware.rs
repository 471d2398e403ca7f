//! Authentication middleware for Axum.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use linkwave_shared::UserRole;

use super::jwt::JwtManager;

/// Authenticated operator identity extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// State needed for authentication.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Forbidden"),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Extract the bearer token from the Authorization header.
fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(String::from)
}

fn authenticate(auth_state: &AuthState, request: &Request) -> Result<AuthUser, AuthError> {
    let token = extract_bearer_token(request).ok_or(AuthError::MissingAuth)?;
    let claims = auth_state
        .jwt_manager
        .validate_token(&token)
        .map_err(|_| AuthError::InvalidToken)?;

    Ok(AuthUser {
        user_id: claims.sub,
        username: claims.username,
        role: claims.role,
    })
}

/// Middleware that requires a valid bearer token.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth_state, &request) {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), error = %err, "Authentication failed");
            err.into_response()
        }
    }
}

/// Middleware that additionally requires the ADMIN role.
pub async fn require_admin(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth_state, &request) {
        Ok(auth_user) => {
            if !auth_user.is_admin() {
                tracing::warn!(
                    path = %request.uri().path(),
                    username = %auth_user.username,
                    "Role check failed"
                );
                return AuthError::InsufficientPermissions.into_response();
            }
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_header(value: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/clients");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(
            extract_bearer_token(&request_with_header(Some("Bearer abc.def.ghi"))),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(extract_bearer_token(&request_with_header(None)), None);
        // Wrong scheme is not a bearer token
        assert_eq!(
            extract_bearer_token(&request_with_header(Some("Basic dXNlcjpwYXNz"))),
            None
        );
    }

    #[test]
    fn missing_token_and_bad_token_are_distinct() {
        let auth_state = AuthState {
            jwt_manager: JwtManager::new("test-secret", 8),
        };

        let err = authenticate(&auth_state, &request_with_header(None)).unwrap_err();
        assert!(matches!(err, AuthError::MissingAuth));

        let err =
            authenticate(&auth_state, &request_with_header(Some("Bearer junk"))).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn valid_token_yields_identity() {
        let manager = JwtManager::new("test-secret", 8);
        let user_id = Uuid::new_v4();
        let token = manager
            .generate_token(user_id, "ops", UserRole::User)
            .unwrap();
        let auth_state = AuthState {
            jwt_manager: manager,
        };

        let user = authenticate(
            &auth_state,
            &request_with_header(Some(&format!("Bearer {token}"))),
        )
        .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.username, "ops");
        assert!(!user.is_admin());
    }
}
