//! Linkwave Background Worker
//!
//! Handles scheduled jobs including:
//! - Overdue invoice sweep (daily at 00:10 UTC)
//! - Receipt file cleanup queue processing (every 5 minutes)
//! - Billing invariant checks (daily at 03:00 UTC)
//! - Health check heartbeat (every 5 minutes)

mod receipt_cleanup;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use linkwave_billing::{mark_overdue_invoices, InvariantChecker};

/// Create a database connection pool
async fn create_db_pool() -> anyhow::Result<sqlx::PgPool> {
    #[allow(clippy::expect_used)] // Fail-fast on startup if required config is missing
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    info!("Database pool created");
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting Linkwave Worker");

    let pool = create_db_pool().await?;

    let scheduler = JobScheduler::new().await?;

    // Job 1: Overdue invoice sweep (daily at 00:10 UTC)
    // The explicit PENDING -> OVERDUE transition; nothing infers OVERDUE
    // at read time.
    let sweep_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 10 0 * * *", move |_uuid, _l| {
            let pool = sweep_pool.clone();
            Box::pin(async move {
                info!("Running overdue invoice sweep");
                let today = OffsetDateTime::now_utc().date();
                match mark_overdue_invoices(&pool, today).await {
                    Ok(count) => info!(transitioned = count, "Overdue sweep complete"),
                    Err(e) => error!(error = %e, "Overdue sweep failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Overdue invoice sweep (daily at 00:10 UTC)");

    // Job 2: Receipt cleanup queue processing (every 5 minutes)
    let cleanup_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 */5 * * * *", move |_uuid, _l| {
            let pool = cleanup_pool.clone();
            Box::pin(async move {
                receipt_cleanup::process_cleanup_queue(&pool).await;
            })
        })?)
        .await?;
    info!("Scheduled: Receipt cleanup queue processing (every 5 minutes)");

    // Job 3: Billing invariant checks (daily at 03:00 UTC)
    let invariant_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 0 3 * * *", move |_uuid, _l| {
            let pool = invariant_pool.clone();
            Box::pin(async move {
                info!("Running billing invariant checks");
                let checker = InvariantChecker::new(pool);
                match checker.run_all_checks().await {
                    Ok(summary) if summary.healthy => {
                        info!(
                            checks_run = summary.checks_run,
                            "Billing invariants healthy"
                        );
                    }
                    Ok(summary) => {
                        warn!(
                            checks_failed = summary.checks_failed,
                            violations = summary.violations.len(),
                            "Billing invariant violations found"
                        );
                        for v in &summary.violations {
                            error!(
                                invariant = %v.invariant,
                                severity = %v.severity,
                                rows = ?v.row_ids,
                                context = %v.context,
                                "{}",
                                v.description
                            );
                        }
                    }
                    Err(e) => error!(error = %e, "Invariant check run failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Billing invariant checks (daily at 03:00 UTC)");

    // Job 4: Health check heartbeat (every 5 minutes)
    scheduler
        .add(Job::new_async("0 */5 * * * *", |_uuid, _l| {
            Box::pin(async move {
                info!("Worker heartbeat - all systems operational");
            })
        })?)
        .await?;
    info!("Scheduled: Health check heartbeat (every 5 minutes)");

    // Start the scheduler
    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("Linkwave Worker started successfully with 4 scheduled jobs");

    // Keep the main task running
    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
