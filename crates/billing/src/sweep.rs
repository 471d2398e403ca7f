//! Due-date sweep.
//!
//! OVERDUE is never computed at read time. This sweep performs the
//! explicit PENDING -> OVERDUE transition for invoices whose due date has
//! passed; the worker runs it daily and operators can still PATCH an
//! individual invoice by hand.

use sqlx::PgPool;
use time::Date;

use crate::error::BillingResult;

/// Mark every PENDING invoice with `due_date < today` as OVERDUE.
/// Returns the number of invoices transitioned.
pub async fn mark_overdue_invoices(pool: &PgPool, today: Date) -> BillingResult<u64> {
    let rows = sqlx::query(
        r#"
        UPDATE invoices
        SET status = 'OVERDUE'
        WHERE status = 'PENDING'
          AND due_date < $1
        "#,
    )
    .bind(today)
    .execute(pool)
    .await?
    .rows_affected();

    if rows > 0 {
        tracing::info!(transitioned = rows, "Overdue sweep complete");
    }

    Ok(rows)
}
