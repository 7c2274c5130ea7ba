//! Interval-driven evaluation loop for the service binary.
//!
//! Alert history lives in the [`AnalyticsService`]'s alert engine, so a
//! single long-lived scheduler is what lets dedup suppress standing
//! conditions across passes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use copytrade_core::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::service::AnalyticsService;

pub struct Scheduler {
    service: Arc<AnalyticsService>,
    alert_interval: Duration,
    report_interval: Duration,
    top_recommendations: usize,
}

impl Scheduler {
    pub fn new(service: Arc<AnalyticsService>, config: &ScheduleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_intervals(
            service,
            Duration::from_secs(config.alert_interval_secs),
            Duration::from_secs(config.report_interval_secs),
        )
        .top_recommendations(config.top_recommendations))
    }

    /// Build with explicit intervals. Both must be non-zero.
    pub fn with_intervals(
        service: Arc<AnalyticsService>,
        alert_interval: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            service,
            alert_interval,
            report_interval,
            top_recommendations: ScheduleConfig::default().top_recommendations,
        }
    }

    pub fn top_recommendations(mut self, limit: usize) -> Self {
        self.top_recommendations = limit;
        self
    }

    /// Run alert and report passes until `shutdown` resolves.
    ///
    /// Both passes run once at startup. A failed pass is logged and retried
    /// on the next tick.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut alert_tick = interval(self.alert_interval);
        alert_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report_tick = interval(self.report_interval);
        report_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            alert_interval_secs = self.alert_interval.as_secs(),
            report_interval_secs = self.report_interval.as_secs(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = alert_tick.tick() => self.alert_pass().await,
                _ = report_tick.tick() => self.report_pass().await,
            }
        }
    }

    async fn alert_pass(&self) {
        match self.service.evaluate_alerts().await {
            Ok(alerts) => debug!(new_alerts = alerts.len(), "Alert pass complete"),
            Err(e) => warn!(error = %format!("{:#}", e), "Alert pass failed"),
        }
    }

    async fn report_pass(&self) {
        match self.service.generate_daily_report().await {
            Ok(report) => info!(
                date = %report.date,
                tracked = report.summary.total_tracked,
                recommendations = report.summary.total_recommendations,
                "Daily report generated"
            ),
            Err(e) => warn!(error = %format!("{:#}", e), "Daily report failed"),
        }

        match self
            .service
            .top_recommendations(self.top_recommendations)
            .await
        {
            Ok(top) => {
                for scored in &top {
                    info!(
                        trader_id = %scored.stats.trader_id,
                        overall = scored.score.overall,
                        "Top recommendation"
                    );
                }
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Top recommendations failed"),
        }
    }
}
