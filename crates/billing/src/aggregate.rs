//! Client-level money aggregation.
//!
//! Derives debt and billing status from stored invoices and payments
//! without mutating anything. The status-derived debt figure is the
//! canonical one; `compute_totals` is an informational reporting figure
//! (see `ClientTotals`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::BillingResult;

/// Derived billing standing of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    Debtor,
    Current,
}

/// Debt > 0 means DEBTOR, anything else CURRENT.
///
/// Total over all non-negative inputs. Negative debt cannot be produced
/// by [`compute_debt`] (amounts are CHECK-constrained positive); seeing
/// one means the store is corrupt, which the invariant checker reports.
pub fn derive_status(debt: Decimal) -> BillingStatus {
    debug_assert!(debt >= Decimal::ZERO, "negative debt is an invariant violation");
    if debt > Decimal::ZERO {
        BillingStatus::Debtor
    } else {
        BillingStatus::Current
    }
}

/// Invoiced-vs-paid totals for one client.
///
/// `pending_balance` is computed from payment totals and may disagree
/// with the invoice-status-derived debt when payments exceed invoiced
/// amounts (overpayment). It is surfaced for reporting, never used to
/// derive the client's billing status.
#[derive(Debug, Clone, Serialize)]
pub struct ClientTotals {
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub pending_balance: Decimal,
}

/// Read-only aggregation over the entity store.
#[derive(Clone)]
pub struct BillingAggregator {
    pool: PgPool,
}

impl BillingAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sum of amounts across the client's invoices not in PAID status.
    /// Zero invoices means zero debt.
    pub async fn compute_debt(&self, client_id: Uuid) -> BillingResult<Decimal> {
        let (debt,): (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM invoices
            WHERE client_id = $1
              AND status <> 'PAID'
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(debt)
    }

    /// Debt and derived status in one call.
    pub async fn billing_status(&self, client_id: Uuid) -> BillingResult<(Decimal, BillingStatus)> {
        let debt = self.compute_debt(client_id).await?;
        Ok((debt, derive_status(debt)))
    }

    /// Total invoiced (any status), total paid, and their difference.
    pub async fn compute_totals(&self, client_id: Uuid) -> BillingResult<ClientTotals> {
        let (total_invoiced,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM invoices WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        let (total_paid,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ClientTotals {
            total_invoiced,
            total_paid,
            pending_balance: total_invoiced - total_paid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_debt_is_current() {
        assert_eq!(derive_status(Decimal::ZERO), BillingStatus::Current);
    }

    #[test]
    fn any_positive_debt_is_debtor() {
        assert_eq!(derive_status(dec!(0.01)), BillingStatus::Debtor);
        assert_eq!(derive_status(dec!(100)), BillingStatus::Debtor);
        assert_eq!(derive_status(dec!(99999999.99)), BillingStatus::Debtor);
    }

    #[test]
    fn billing_status_serializes_like_the_api() {
        assert_eq!(
            serde_json::to_string(&BillingStatus::Debtor).unwrap(),
            "\"DEBTOR\""
        );
        assert_eq!(
            serde_json::to_string(&BillingStatus::Current).unwrap(),
            "\"CURRENT\""
        );
    }
}
