//! Billing error types.

use linkwave_shared::{ClientStatus, ContractStatus, InvoiceStatus};

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("client not found")]
    ClientNotFound,

    #[error("illegal invoice transition: {from:?} -> {to:?}")]
    IllegalInvoiceTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("illegal contract transition: {from:?} -> {to:?}")]
    IllegalContractTransition {
        from: ContractStatus,
        to: ContractStatus,
    },

    #[error("illegal client transition: {from:?} -> {to:?}")]
    IllegalClientTransition {
        from: ClientStatus,
        to: ClientStatus,
    },

    #[error("amount must be positive")]
    AmountNotPositive,

    #[error("payment client does not match invoice client")]
    PaymentClientMismatch,
}
