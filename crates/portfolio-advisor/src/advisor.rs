//! Removal and increase candidates plus portfolio variance.
//!
//! Win rates here are wins over all trades as a 0-1 fraction, independent
//! of the scoring engine's percentage over trades with known P&L.

use chrono::NaiveDate;
use copytrade_core::types::TraderStats;
use copytrade_core::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::report::{DailyReport, Performer, ReportRecommendations, ReportSummary};

/// Advisor thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Flag for removal below this win ratio (0-1).
    pub removal_win_rate: f64,
    /// Flag for increase above this win ratio (0-1).
    pub increase_win_rate: f64,
    /// Flag for removal when total P&L is below the negation of this.
    pub loss_threshold: Decimal,
    /// Increase requires total P&L above this.
    pub profit_threshold: Decimal,
    /// Recommend diversifying above this P&L variance.
    pub variance_threshold: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            removal_win_rate: 0.4,
            increase_win_rate: 0.7,
            loss_threshold: Decimal::ZERO,
            profit_threshold: Decimal::ZERO,
            variance_threshold: 0.0,
        }
    }
}

impl AdvisorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("removal_win_rate", self.removal_win_rate),
            ("increase_win_rate", self.increase_win_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, rate
                )));
            }
        }
        if self.loss_threshold < Decimal::ZERO || self.profit_threshold < Decimal::ZERO {
            return Err(Error::config("advisor P&L thresholds must not be negative"));
        }
        if !self.variance_threshold.is_finite() || self.variance_threshold < 0.0 {
            return Err(Error::config(
                "variance_threshold must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// A trader picked out by one of the advisor passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderFlag {
    pub trader_id: String,
    pub label: Option<String>,
    pub trade_count: u64,
    /// Wins over all trades (0-1).
    pub win_rate: f64,
    pub total_profit_loss: Decimal,
    /// One entry per triggered condition.
    pub reasons: Vec<String>,
}

impl TraderFlag {
    fn new(stats: &TraderStats, reasons: Vec<String>) -> Self {
        Self {
            trader_id: stats.trader_id.clone(),
            label: stats.label.clone(),
            trade_count: stats.trade_count,
            win_rate: stats.raw_win_ratio(),
            total_profit_loss: stats.total_profit_loss,
            reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Population variance of total P&L across traders.
    pub variance: f64,
    pub mean: f64,
    pub count: usize,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioAdvisor {
    config: AdvisorConfig,
}

impl PortfolioAdvisor {
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Traders below the removal win rate or past the loss threshold.
    pub fn analyze_for_removal(&self, stats: &[TraderStats]) -> Vec<TraderFlag> {
        stats
            .iter()
            .filter_map(|s| {
                let mut reasons = Vec::new();
                let win_rate = s.raw_win_ratio();

                if win_rate < self.config.removal_win_rate {
                    reasons.push(format!(
                        "win rate {:.2}% < {:.0}%",
                        win_rate * 100.0,
                        self.config.removal_win_rate * 100.0
                    ));
                }
                if s.total_profit_loss < -self.config.loss_threshold {
                    reasons.push(format!(
                        "total loss {:.2} < -{:.2}",
                        s.total_profit_loss, self.config.loss_threshold
                    ));
                }

                if reasons.is_empty() {
                    return None;
                }
                debug!(trader_id = %s.trader_id, ?reasons, "Flagged for removal");
                Some(TraderFlag::new(s, reasons))
            })
            .collect()
    }

    /// Traders above the increase win rate and the profit threshold.
    pub fn analyze_for_increase(&self, stats: &[TraderStats]) -> Vec<TraderFlag> {
        stats
            .iter()
            .filter_map(|s| {
                let win_rate = s.raw_win_ratio();
                if win_rate <= self.config.increase_win_rate
                    || s.total_profit_loss <= self.config.profit_threshold
                {
                    return None;
                }

                let reasons = vec![
                    format!(
                        "win rate {:.2}% > {:.0}%",
                        win_rate * 100.0,
                        self.config.increase_win_rate * 100.0
                    ),
                    format!(
                        "profit {:.2} > {:.2}",
                        s.total_profit_loss, self.config.profit_threshold
                    ),
                ];
                debug!(trader_id = %s.trader_id, "Flagged for increase");
                Some(TraderFlag::new(s, reasons))
            })
            .collect()
    }

    pub fn analyze_portfolio(&self, stats: &[TraderStats]) -> PortfolioSummary {
        if stats.is_empty() {
            return PortfolioSummary {
                variance: 0.0,
                mean: 0.0,
                count: 0,
                recommendation: "No portfolio data available yet.".to_string(),
            };
        }

        let values: Vec<f64> = stats.iter().map(|s| s.total_profit_loss_f64()).collect();
        let mean = values.iter().mean();
        let variance = values.iter().population_variance();

        let recommendation = if variance > self.config.variance_threshold {
            "Portfolio variance is high; consider diversifying across more consistent traders."
        } else {
            "Portfolio variance is within the acceptable range."
        };

        PortfolioSummary {
            variance,
            mean,
            count: values.len(),
            recommendation: recommendation.to_string(),
        }
    }

    /// Compose every pass into one report for `date` (UTC).
    pub fn generate_daily_report(&self, stats: &[TraderStats], date: NaiveDate) -> DailyReport {
        let remove = self.analyze_for_removal(stats);
        let increase = self.analyze_for_increase(stats);
        let portfolio = self.analyze_portfolio(stats);

        let mut ranked: Vec<&TraderStats> = stats.iter().collect();
        ranked.sort_by(|a, b| b.total_profit_loss.cmp(&a.total_profit_loss));

        let report = DailyReport {
            date,
            summary: ReportSummary {
                total_tracked: stats.len(),
                total_recommendations: remove.len() + increase.len(),
            },
            top_performer: ranked.first().map(|s| Performer::from(*s)),
            worst_performer: ranked.last().map(|s| Performer::from(*s)),
            recommendations: ReportRecommendations {
                remove,
                increase,
                portfolio,
            },
        };

        info!(
            date = %report.date,
            tracked = report.summary.total_tracked,
            recommendations = report.summary.total_recommendations,
            "Daily report generated"
        );
        report
    }
}
