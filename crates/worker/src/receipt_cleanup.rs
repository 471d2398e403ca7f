//! Receipt file cleanup queue processor.
//!
//! The API deletes a receipt's database row first and enqueues the file
//! unlink here. Each drain pass retries every queued unlink with
//! exponential backoff; a file that is already gone counts as done. Rows
//! that keep failing stay queued and are surfaced at ERROR once they
//! cross the attempt threshold.

use std::time::Duration;

use sqlx::PgPool;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Unlink attempts per drain pass.
const RETRIES_PER_PASS: usize = 3;

/// After this many recorded attempts the entry is flagged for an operator.
const ATTEMPT_ALARM_THRESHOLD: i32 = 10;

#[derive(Debug, sqlx::FromRow)]
struct CleanupRow {
    id: Uuid,
    file_path: String,
    attempts: i32,
}

async fn unlink(path: &str) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        // Already gone - the goal state, not a failure.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Drain the cleanup queue once. Returns (removed, still_pending).
pub async fn process_cleanup_queue(pool: &PgPool) -> (u64, u64) {
    let rows: Vec<CleanupRow> = match sqlx::query_as(
        "SELECT id, file_path, attempts FROM receipt_cleanup ORDER BY queued_at ASC LIMIT 100",
    )
    .fetch_all(pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "Failed to read receipt cleanup queue");
            return (0, 0);
        }
    };

    let mut removed = 0u64;
    let mut pending = 0u64;

    for row in rows {
        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(2))
            .take(RETRIES_PER_PASS);

        let result = Retry::spawn(strategy, || unlink(&row.file_path)).await;

        match result {
            Ok(()) => {
                if let Err(e) = sqlx::query("DELETE FROM receipt_cleanup WHERE id = $1")
                    .bind(row.id)
                    .execute(pool)
                    .await
                {
                    error!(error = %e, id = %row.id, "Failed to dequeue cleaned-up receipt file");
                } else {
                    removed += 1;
                }
            }
            Err(e) => {
                pending += 1;
                let attempts = row.attempts + 1;
                if let Err(db_err) =
                    sqlx::query("UPDATE receipt_cleanup SET attempts = $2 WHERE id = $1")
                        .bind(row.id)
                        .bind(attempts)
                        .execute(pool)
                        .await
                {
                    error!(error = %db_err, id = %row.id, "Failed to record cleanup attempt");
                }

                if attempts >= ATTEMPT_ALARM_THRESHOLD {
                    error!(
                        path = %row.file_path,
                        attempts = attempts,
                        error = %e,
                        "Receipt file cannot be removed - needs operator attention"
                    );
                } else {
                    warn!(
                        path = %row.file_path,
                        attempts = attempts,
                        error = %e,
                        "Receipt file unlink failed, will retry next pass"
                    );
                }
            }
        }
    }

    if removed > 0 || pending > 0 {
        info!(removed = removed, pending = pending, "Receipt cleanup pass complete");
    }

    (removed, pending)
}
