//! Reminder sweep binary.
//!
//! With no argument, runs both sweep kinds on a fixed interval. With a
//! `day-before` or `hour-before` argument, runs that sweep once and exits —
//! for external cron-style triggers.

use std::sync::Arc;
use std::time::Duration;

use stride_common::config::AppConfig;
use stride_common::db::create_pool;
use stride_common::types::ReminderKind;
use stride_engine::dispatcher::EventDispatcher;
use stride_engine::sweep::ReminderScheduler;
use stride_gateway::{ExpoPushClient, PushGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stride_sweeper=info,stride_engine=info".into()),
        )
        .json()
        .init();

    tracing::info!("Stride Herald sweeper starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let gateway: Arc<dyn PushGateway> = Arc::new(ExpoPushClient::new(
        config.push_gateway_url.clone(),
        Duration::from_secs(config.push_timeout_secs),
    )?);

    let dispatcher = EventDispatcher::new(pool, gateway, config.push_chunk_concurrency);
    let scheduler = ReminderScheduler::new(dispatcher);

    // One-shot mode for external schedulers.
    if let Some(arg) = std::env::args().nth(1) {
        let kind: ReminderKind = arg.parse()?;
        let report = scheduler.sweep(kind).await?;
        tracing::info!(
            kind = %kind,
            runs = report.runs_matched,
            "One-shot sweep finished"
        );
        return Ok(());
    }

    let interval = Duration::from_secs(config.sweep_interval_secs);
    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        "Sweeper loop started"
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = run_loop(&scheduler, interval) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Stride Herald sweeper stopped.");
    Ok(())
}

async fn run_loop(scheduler: &ReminderScheduler, interval: Duration) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        for kind in [ReminderKind::DayBefore, ReminderKind::HourBefore] {
            if let Err(e) = scheduler.sweep(kind).await {
                tracing::error!(kind = %kind, error = %e, "Reminder sweep failed");
            }
        }
    }
}
