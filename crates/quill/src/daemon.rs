//! Daemon command: run the job scheduler until interrupted.
//!
//! Several daemons may share one database. Each polls on its own; the
//! conditional claim in the store keeps them from running a job twice.

use std::sync::Arc;

use miette::Result;
use tokio::sync::watch;
use tracing::info;

use quill_scheduler::{Clock, SystemClock};
use quill_store::SqliteStore;

use crate::app::App;
use crate::config::{DaemonConfig, build_messenger};

pub async fn run(config: DaemonConfig) -> Result<()> {
    let store = Arc::new(SqliteStore::open(&config.database).map_err(|e| miette::miette!("{}", e))?);
    let messenger =
        build_messenger(config.discord.as_ref()).map_err(|e| miette::miette!("{}", e))?;
    if config.discord.is_none() {
        info!("no Discord token configured, messages will only be logged");
    }

    let clock = Arc::new(SystemClock);
    let app = App::new(store, messenger, clock);

    let scheduler = app
        .scheduler()
        .map_err(|e| miette::miette!("{}", e))?
        .with_poll_interval(config.poll_interval);

    let recovered = scheduler
        .recover()
        .await
        .map_err(|e| miette::miette!("{}", e))?;
    if recovered > 0 {
        info!(count = recovered, "released claims left by a previous run");
    }

    let goal_job = quill_goals::install(&app.queue, app.clock.now())
        .await
        .map_err(|e| miette::miette!("failed to install goal reset job: {}", e))?;
    info!(job_id = goal_job.id, "goal reset job installed");

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    info!(
        database = %config.database.display(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "daemon started"
    );
    scheduler.run(shutdown_rx).await;

    info!("daemon stopped");
    Ok(())
}
