//! Route handlers and router assembly.
//!
//! Three tiers: public routes (login, signup, the portal DNI lookup,
//! served receipt files), token-protected routes (all entity CRUD), and
//! admin routes (operator account creation). Order matters inside each
//! router: the `/dni/...`, `/client/...` style filters are declared on
//! their own segments so they never collide with `/{id}`.

pub mod auth;
pub mod clients;
pub mod contracts;
pub mod invoices;
pub mod payments;
pub mod plans;
pub mod public;
pub mod receipts;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::services::ServeDir;

use crate::auth::{require_admin, require_auth};
use crate::state::AppState;

/// Receipt uploads are images or PDFs; 10 MiB is plenty.
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/public/signup", post(public::signup))
        .route("/clients/dni/{dni}", get(clients::get_by_dni));

    let protected_routes = Router::new()
        .route("/clients", get(clients::list).post(clients::create))
        .route(
            "/clients/{id}",
            get(clients::get)
                .put(clients::update)
                .delete(clients::remove),
        )
        .route("/clients/{id}/status", patch(clients::update_status))
        .route("/clients/{id}/billing", get(clients::billing_summary))
        .route("/plans", get(plans::list).post(plans::create))
        .route(
            "/plans/{id}",
            get(plans::get).put(plans::update).delete(plans::remove),
        )
        .route("/contracts", get(contracts::list).post(contracts::create))
        .route(
            "/contracts/{id}",
            get(contracts::get)
                .put(contracts::update)
                .delete(contracts::remove),
        )
        .route("/contracts/{id}/status", patch(contracts::update_status))
        .route("/contracts/client/{client_id}", get(contracts::list_by_client))
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route(
            "/invoices/{id}",
            get(invoices::get)
                .put(invoices::update)
                .delete(invoices::remove),
        )
        .route("/invoices/{id}/status", patch(invoices::update_status))
        .route("/invoices/client/{client_id}", get(invoices::list_by_client))
        .route(
            "/invoices/contract/{contract_id}",
            get(invoices::list_by_contract),
        )
        .route("/payments", get(payments::list).post(payments::create))
        .route(
            "/payments/{id}",
            get(payments::get)
                .put(payments::update)
                .delete(payments::remove),
        )
        .route("/payments/client/{client_id}", get(payments::list_by_client))
        .route(
            "/payments/invoice/{invoice_id}",
            get(payments::list_by_invoice),
        )
        .route("/receipts", get(receipts::list).post(receipts::upload))
        .route(
            "/receipts/{id}",
            get(receipts::get).delete(receipts::remove),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ));

    let admin_routes = Router::new()
        .route("/users", post(users::create))
        .route_layer(middleware::from_fn_with_state(auth_state, require_admin));

    let api = public_routes.merge(protected_routes).merge(admin_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service(
            "/uploads/receipts",
            ServeDir::new(state.config.upload_dir.clone()),
        )
        .with_state(state)
}
