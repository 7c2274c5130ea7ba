//! Copy-trade analytics service.
//!
//! Evaluates alerts on a fixed interval and builds the advisor report once
//! per report interval until Ctrl-C. Alert history is kept in this process,
//! so a standing condition alerts once per dedup window rather than on every
//! pass.

use std::sync::Arc;

use analytics_service::{AnalyticsService, Scheduler, ServiceConfig};
use copytrade_core::telemetry;
use risk_manager::Alert;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()?;
    telemetry::init_tracing(&config.log);

    info!("Starting copy-trade analytics service");
    let service = Arc::new(AnalyticsService::connect(&config).await?);

    service
        .alerts()
        .subscribe(|alerts: &[Alert]| {
            for alert in alerts {
                info!(
                    trader_id = %alert.trader_id,
                    alert_type = ?alert.alert_type,
                    metric = ?alert.metric,
                    "{}",
                    alert.description
                );
            }
        })
        .await;

    let scheduler = Scheduler::new(Arc::clone(&service), &config.schedule)?;
    scheduler.run_until(shutdown_signal()).await;

    info!("Analytics service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
