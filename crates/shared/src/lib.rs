#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared infrastructure for the Linkwave workspace: database pool
//! construction, embedded migrations, and the domain status enums used by
//! the API server, the billing crate, and the background worker.

pub mod db;
pub mod types;

pub use db::{create_migration_pool, create_pool, run_migrations};
pub use types::{
    BillingCycle, ClientStatus, ContractStatus, InvoiceStatus, PlanCategory, ReceiptKind, UserRole,
};
