//! Authentication module for Linkwave

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtManager};
pub use middleware::{require_admin, require_auth, AuthError, AuthState, AuthUser};
pub use password::{hash_password, verify_password};
