// Billing crate clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Linkwave Billing Module
//!
//! The billing/debt model: everything that derives a client's standing
//! from stored invoices and payments, and the rules that govern status
//! changes.
//!
//! ## Features
//!
//! - **Aggregation**: per-client debt, derived DEBTOR/CURRENT status,
//!   invoiced-vs-paid totals
//! - **Transitions**: enforced lifecycle tables for invoices, contracts,
//!   and clients, with idempotent same-state writes and admin override
//! - **Settlement**: payment recording that settles its invoice in the
//!   same transaction
//! - **Sweep**: explicit PENDING -> OVERDUE due-date sweep
//! - **Invariants**: runnable read-only consistency checks

pub mod aggregate;
pub mod error;
pub mod invariants;
pub mod settlement;
pub mod sweep;
pub mod transitions;

#[cfg(test)]
mod edge_case_tests;

// Aggregation
pub use aggregate::{derive_status, BillingAggregator, BillingStatus, ClientTotals};

// Error
pub use error::{BillingError, BillingResult};

// Invariants
pub use invariants::{
    InvariantCheckSummary, InvariantChecker, InvariantViolation, ViolationSeverity,
};

// Settlement
pub use settlement::{record_payment, NewPayment, Payment, SettlementOutcome};

// Sweep
pub use sweep::mark_overdue_invoices;

// Transitions
pub use transitions::{
    client_transition_allowed, contract_transition_allowed, invoice_transition_allowed,
    plan_client_transition, plan_contract_transition, plan_invoice_transition, TransitionOutcome,
};
