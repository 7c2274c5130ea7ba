//! Layered service configuration.

use backtester::SimulatorConfig;
use config::{Config, Environment, File};
use copytrade_core::config::{DatabaseConfig, LogConfig};
use copytrade_core::{Error, Result};
use portfolio_advisor::AdvisorConfig;
use risk_manager::AlertEngineConfig;
use serde::{Deserialize, Serialize};
use wallet_tracker::ScoringWeights;

/// Settings for every component. Missing sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub log: LogConfig,
    pub database: Option<DatabaseConfig>,
    pub scoring: ScoringWeights,
    pub simulator: SimulatorConfig,
    pub alerts: AlertEngineConfig,
    pub advisor: AdvisorConfig,
    pub schedule: ScheduleConfig,
}

/// Pass intervals for the long-running binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between alert evaluation passes.
    pub alert_interval_secs: u64,
    /// Seconds between advisor report passes.
    pub report_interval_secs: u64,
    /// Top recommendations logged with each report.
    pub top_recommendations: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            alert_interval_secs: 60,
            report_interval_secs: 86_400,
            top_recommendations: 10,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.alert_interval_secs == 0 || self.report_interval_secs == 0 {
            return Err(Error::config("schedule intervals must be positive"));
        }
        Ok(())
    }
}

impl ServiceConfig {
    /// Load configuration from:
    /// 1. `copytrade.toml` in the working directory (optional)
    /// 2. `COPYTRADE__SECTION__KEY` environment variables
    /// 3. `DATABASE_URL` when no database section was given
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from("copytrade")
    }

    /// Same as [`ServiceConfig::load`] with an explicit file stem.
    pub fn load_from(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("COPYTRADE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: ServiceConfig = settings.try_deserialize()?;
        if config.database.is_none() {
            config.database = DatabaseConfig::from_env();
        }
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.simulator.validate()?;
        self.alerts.validate()?;
        self.advisor.validate()?;
        self.schedule.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytrade_core::config::LogFormat;
    use rust_decimal::Decimal;
    use std::fs;

    fn write_config(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path.with_extension("").to_string_lossy().into_owned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alerts.history_capacity, 1000);
        assert_eq!(config.simulator.initial_capital, Decimal::new(1000, 0));
        assert_eq!(config.schedule.alert_interval_secs, 60);
        assert_eq!(config.schedule.report_interval_secs, 86_400);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let stem = write_config(
            "copytrade-zero-interval",
            r#"
            [schedule]
            alert_interval_secs = 0
            "#,
        );

        assert!(ServiceConfig::load_from(&stem).is_err());
    }

    #[test]
    fn test_file_overrides_sections() {
        let stem = write_config(
            "copytrade-overrides",
            r#"
            [log]
            format = "json"

            [simulator]
            initial_capital = 5000

            [alerts]
            history_capacity = 200
            "#,
        );

        let config = ServiceConfig::load_from(&stem).unwrap();
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.simulator.initial_capital, Decimal::new(5000, 0));
        assert_eq!(config.alerts.history_capacity, 200);
        assert_eq!(config.alerts.dedup_lookback, 50);
        assert_eq!(config.advisor, AdvisorConfig::default());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let stem = write_config(
            "copytrade-bad-weights",
            r#"
            [scoring]
            win_rate = 0.5
            profit_factor = 0.5
            sharpe_ratio = 0.5
            consistency = 0.0
            risk_management = 0.0
            activity = 0.0
            "#,
        );

        assert!(ServiceConfig::load_from(&stem).is_err());
    }
}
