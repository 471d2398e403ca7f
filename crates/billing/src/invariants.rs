//! Billing invariants.
//!
//! Runnable consistency checks over the entity store. The worker runs the
//! full set daily; each check is a plain read-only SQL query and every
//! violation carries enough context to debug from the log line alone.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;

/// A single failed consistency check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Which invariant was violated
    pub invariant: String,
    /// Rows affected
    pub row_ids: Vec<Uuid>,
    /// Human-readable description of the violation
    pub description: String,
    /// Additional context for debugging
    pub context: serde_json::Value,
    /// Severity level
    pub severity: ViolationSeverity,
}

/// Severity of an invariant violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Critical - billing state is wrong
    Critical,
    /// High - data inconsistency that needs attention
    High,
    /// Medium - potential issue, should investigate
    Medium,
    /// Low - minor inconsistency, informational
    Low,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSeverity::Critical => write!(f, "CRITICAL"),
            ViolationSeverity::High => write!(f, "HIGH"),
            ViolationSeverity::Medium => write!(f, "MEDIUM"),
            ViolationSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Summary of a full invariant run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheckSummary {
    pub checked_at: OffsetDateTime,
    pub checks_run: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub violations: Vec<InvariantViolation>,
    pub healthy: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct UncoveredPaidInvoiceRow {
    invoice_id: Uuid,
    client_id: Uuid,
    amount: Decimal,
    total_paid: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct ClientMismatchRow {
    invoice_id: Uuid,
    invoice_client_id: Uuid,
    contract_client_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct StalePendingRow {
    invoice_id: Uuid,
    client_id: Uuid,
    due_date: time::Date,
}

#[derive(Debug, sqlx::FromRow)]
struct NonPositiveAmountRow {
    row_id: Uuid,
    table_name: String,
    amount: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct TerminatedWithActiveContractRow {
    client_id: Uuid,
    contract_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct CancelledNoEndDateRow {
    contract_id: Uuid,
    client_id: Uuid,
}

/// Service for running billing invariant checks.
pub struct InvariantChecker {
    pool: PgPool,
}

impl InvariantChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all invariant checks and return summary.
    pub async fn run_all_checks(&self) -> BillingResult<InvariantCheckSummary> {
        let now = OffsetDateTime::now_utc();
        let mut violations = Vec::new();

        violations.extend(self.check_paid_invoices_covered().await?);
        violations.extend(self.check_invoice_client_matches_contract().await?);
        violations.extend(self.check_no_stale_pending().await?);
        violations.extend(self.check_amounts_positive().await?);
        violations.extend(self.check_terminated_clients_inactive().await?);
        violations.extend(self.check_cancelled_contracts_dated().await?);

        let checks_run = 6;
        let checks_failed = violations
            .iter()
            .map(|v| &v.invariant)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let checks_passed = checks_run - checks_failed;

        Ok(InvariantCheckSummary {
            checked_at: now,
            checks_run,
            checks_passed,
            checks_failed,
            healthy: violations.is_empty(),
            violations,
        })
    }

    /// Invariant 1: PAID invoices are fully covered by payments.
    ///
    /// Settlement flips an invoice to PAID only when cumulative payments
    /// reach its amount, so an uncovered PAID invoice means someone
    /// bypassed the settlement path (e.g. a manual override).
    async fn check_paid_invoices_covered(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<UncoveredPaidInvoiceRow> = sqlx::query_as(
            r#"
            SELECT
                i.id as invoice_id,
                i.client_id,
                i.amount,
                COALESCE(SUM(p.amount), 0) as total_paid
            FROM invoices i
            LEFT JOIN payments p ON p.invoice_id = i.id
            WHERE i.status = 'PAID'
            GROUP BY i.id, i.client_id, i.amount
            HAVING COALESCE(SUM(p.amount), 0) < i.amount
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "paid_invoices_covered".to_string(),
                row_ids: vec![row.invoice_id],
                description: format!(
                    "Invoice is PAID but payments total {} of {}",
                    row.total_paid, row.amount
                ),
                context: serde_json::json!({
                    "client_id": row.client_id,
                    "amount": row.amount.to_string(),
                    "total_paid": row.total_paid.to_string(),
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 2: The denormalized invoice.client_id matches the
    /// contract's client.
    async fn check_invoice_client_matches_contract(
        &self,
    ) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<ClientMismatchRow> = sqlx::query_as(
            r#"
            SELECT
                i.id as invoice_id,
                i.client_id as invoice_client_id,
                c.client_id as contract_client_id
            FROM invoices i
            JOIN contracts c ON c.id = i.contract_id
            WHERE i.client_id <> c.client_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "invoice_client_matches_contract".to_string(),
                row_ids: vec![row.invoice_id],
                description: "Invoice client does not match its contract's client".to_string(),
                context: serde_json::json!({
                    "invoice_client_id": row.invoice_client_id,
                    "contract_client_id": row.contract_client_id,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 3: No PENDING invoice sits past its due date.
    ///
    /// The worker sweep should have moved these to OVERDUE; violations
    /// here mean the sweep is not running.
    async fn check_no_stale_pending(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<StalePendingRow> = sqlx::query_as(
            r#"
            SELECT id as invoice_id, client_id, due_date
            FROM invoices
            WHERE status = 'PENDING'
              AND due_date < CURRENT_DATE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "no_stale_pending".to_string(),
                row_ids: vec![row.invoice_id],
                description: format!("Invoice still PENDING past due date {}", row.due_date),
                context: serde_json::json!({
                    "client_id": row.client_id,
                    "due_date": row.due_date.to_string(),
                }),
                severity: ViolationSeverity::Medium,
            })
            .collect())
    }

    /// Invariant 4: All invoice and payment amounts are positive.
    ///
    /// The schema CHECK-constrains this; a violation means the constraint
    /// was dropped or the row predates it.
    async fn check_amounts_positive(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<NonPositiveAmountRow> = sqlx::query_as(
            r#"
            SELECT id as row_id, 'invoices' as table_name, amount
            FROM invoices
            WHERE amount <= 0
            UNION ALL
            SELECT id as row_id, 'payments' as table_name, amount
            FROM payments
            WHERE amount <= 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "amounts_positive".to_string(),
                row_ids: vec![row.row_id],
                description: format!(
                    "{} row has non-positive amount {}",
                    row.table_name, row.amount
                ),
                context: serde_json::json!({
                    "table": row.table_name,
                    "amount": row.amount.to_string(),
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 5: TERMINATED clients hold no ACTIVE contracts.
    async fn check_terminated_clients_inactive(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<TerminatedWithActiveContractRow> = sqlx::query_as(
            r#"
            SELECT cl.id as client_id, c.id as contract_id
            FROM clients cl
            JOIN contracts c ON c.client_id = cl.id
            WHERE cl.status = 'TERMINATED'
              AND c.status = 'ACTIVE'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "terminated_clients_inactive".to_string(),
                row_ids: vec![row.client_id],
                description: "Terminated client still has an active contract".to_string(),
                context: serde_json::json!({
                    "contract_id": row.contract_id,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 6: CANCELLED contracts carry an end date.
    async fn check_cancelled_contracts_dated(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<CancelledNoEndDateRow> = sqlx::query_as(
            r#"
            SELECT id as contract_id, client_id
            FROM contracts
            WHERE status = 'CANCELLED'
              AND end_date IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "cancelled_contracts_dated".to_string(),
                row_ids: vec![row.contract_id],
                description: "Cancelled contract has no end date".to_string(),
                context: serde_json::json!({
                    "client_id": row.client_id,
                }),
                severity: ViolationSeverity::Medium,
            })
            .collect())
    }

    /// Run a single invariant check by name.
    pub async fn run_check(&self, name: &str) -> BillingResult<Vec<InvariantViolation>> {
        match name {
            "paid_invoices_covered" => self.check_paid_invoices_covered().await,
            "invoice_client_matches_contract" => self.check_invoice_client_matches_contract().await,
            "no_stale_pending" => self.check_no_stale_pending().await,
            "amounts_positive" => self.check_amounts_positive().await,
            "terminated_clients_inactive" => self.check_terminated_clients_inactive().await,
            "cancelled_contracts_dated" => self.check_cancelled_contracts_dated().await,
            _ => Ok(vec![]),
        }
    }

    /// Get list of all available invariant checks.
    pub fn available_checks() -> Vec<&'static str> {
        vec![
            "paid_invoices_covered",
            "invoice_client_matches_contract",
            "no_stale_pending",
            "amounts_positive",
            "terminated_clients_inactive",
            "cancelled_contracts_dated",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_severity_display() {
        assert_eq!(ViolationSeverity::Critical.to_string(), "CRITICAL");
        assert_eq!(ViolationSeverity::High.to_string(), "HIGH");
        assert_eq!(ViolationSeverity::Medium.to_string(), "MEDIUM");
        assert_eq!(ViolationSeverity::Low.to_string(), "LOW");
    }

    #[test]
    fn test_available_checks() {
        let checks = InvariantChecker::available_checks();
        assert_eq!(checks.len(), 6);
        assert!(checks.contains(&"paid_invoices_covered"));
        assert!(checks.contains(&"invoice_client_matches_contract"));
    }
}
