//! Customer monitor job.
//!
//! Pushes every business and consumer changed since the last run to the
//! monitoring service, then exits. Meant to be run on a schedule.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use core_platform::{
    config::{self, MonitorConfig},
    db,
    jobs::monitor::{HttpMonitorSink, MonitorJob},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config: MonitorConfig = config::from_env().context("loading monitor configuration")?;
    let pool = db::create_pool(&config.database_url).await?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let sink = Arc::new(HttpMonitorSink::new(http, config.monitor_sink_url.clone()));

    let report = MonitorJob::new(pool, sink, config.monitor_batch_size)
        .run()
        .await?;

    tracing::info!(pushed = report.pushed, failed = report.failed, "Monitor run complete");
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "Some records were not accepted by the monitor");
    }

    Ok(())
}
