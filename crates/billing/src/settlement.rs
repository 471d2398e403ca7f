//! Payment recording and invoice settlement.
//!
//! Recording a payment and settling its invoice happen in one database
//! transaction: the payment row is inserted, and when cumulative payments
//! reach the invoice amount the invoice transitions to PAID through the
//! transition table. A partial payment leaves the invoice status alone.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use linkwave_shared::InvoiceStatus;

use crate::error::{BillingError, BillingResult};
use crate::transitions::{plan_invoice_transition, TransitionOutcome};

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub payment_date: Date,
    pub amount: Decimal,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub receipt_id: Option<Uuid>,
}

/// Persisted payment row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub payment_date: Date,
    pub amount: Decimal,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub receipt_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What happened to the invoice as a result of the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOutcome {
    /// Cumulative payments now cover the invoice; it transitioned to PAID.
    InvoiceSettled,
    /// Invoice remains open; `remaining` is still owed.
    PartiallyPaid,
    /// Invoice was already PAID before this payment (overpayment).
    AlreadySettled,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceForSettlement {
    client_id: Uuid,
    amount: Decimal,
    status: InvoiceStatus,
}

/// Whether cumulative payments cover the invoice amount.
pub fn is_settled(total_paid: Decimal, invoice_amount: Decimal) -> bool {
    total_paid >= invoice_amount
}

/// Record a payment and settle its invoice if now fully covered.
pub async fn record_payment(
    pool: &PgPool,
    new: NewPayment,
) -> BillingResult<(Payment, SettlementOutcome)> {
    if new.amount <= Decimal::ZERO {
        return Err(BillingError::AmountNotPositive);
    }

    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    // Lock the invoice row so concurrent payments against the same
    // invoice serialize their settlement decision.
    let invoice: InvoiceForSettlement = sqlx::query_as(
        r#"
        SELECT client_id, amount, status
        FROM invoices
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(new.invoice_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(BillingError::InvoiceNotFound)?;

    if invoice.client_id != new.client_id {
        return Err(BillingError::PaymentClientMismatch);
    }

    let payment: Payment = sqlx::query_as(
        r#"
        INSERT INTO payments (invoice_id, client_id, payment_date, amount, method, reference, receipt_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, invoice_id, client_id, payment_date, amount, method, reference, receipt_id, created_at
        "#,
    )
    .bind(new.invoice_id)
    .bind(new.client_id)
    .bind(new.payment_date)
    .bind(new.amount)
    .bind(&new.method)
    .bind(&new.reference)
    .bind(new.receipt_id)
    .fetch_one(&mut *tx)
    .await?;

    let (total_paid,): (Decimal,) =
        sqlx::query_as("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1")
            .bind(new.invoice_id)
            .fetch_one(&mut *tx)
            .await?;

    let outcome = if invoice.status == InvoiceStatus::Paid {
        SettlementOutcome::AlreadySettled
    } else if is_settled(total_paid, invoice.amount) {
        // PENDING -> PAID and OVERDUE -> PAID are both legal edges, so
        // this cannot fail for an open invoice.
        match plan_invoice_transition(invoice.status, InvoiceStatus::Paid, false)? {
            TransitionOutcome::Changed => {
                sqlx::query("UPDATE invoices SET status = 'PAID' WHERE id = $1")
                    .bind(new.invoice_id)
                    .execute(&mut *tx)
                    .await?;
            }
            TransitionOutcome::Unchanged => {}
        }
        SettlementOutcome::InvoiceSettled
    } else {
        SettlementOutcome::PartiallyPaid
    };

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        invoice_id = %new.invoice_id,
        client_id = %new.client_id,
        amount = %new.amount,
        outcome = ?outcome,
        "Payment recorded"
    );

    Ok((payment, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn exact_payment_settles() {
        assert!(is_settled(dec!(50), dec!(50)));
    }

    #[test]
    fn overpayment_settles() {
        assert!(is_settled(dec!(50.01), dec!(50)));
    }

    #[test]
    fn partial_payment_does_not_settle() {
        assert!(!is_settled(dec!(49.99), dec!(50)));
        assert!(!is_settled(Decimal::ZERO, dec!(50)));
    }

    #[test]
    fn settlement_accumulates_across_payments() {
        // Two partial payments that only together cover the invoice.
        let invoice = dec!(100);
        let first = dec!(40);
        let second = dec!(60);
        assert!(!is_settled(first, invoice));
        assert!(is_settled(first + second, invoice));
    }
}
