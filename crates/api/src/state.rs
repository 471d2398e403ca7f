//! Application state

use sqlx::PgPool;

use linkwave_billing::BillingAggregator;

use crate::{
    auth::{AuthState, JwtManager},
    config::Config,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    /// Read-only billing aggregation over the entity store
    pub aggregator: BillingAggregator,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);
        let aggregator = BillingAggregator::new(pool.clone());

        Self {
            pool,
            config,
            jwt_manager,
            aggregator,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
