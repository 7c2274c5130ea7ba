//! Copy-Trade Analytics: performance analytics for copy-traded Polymarket wallets
//!
//! This is the root crate that provides integration-test and benchmark access
//! to the workspace. For actual functionality, use the individual crates:
//!
//! - `copytrade-core`: Trade/stats types, storage traits and adapters, errors
//! - `wallet-tracker`: Trade metrics and composite trader scoring
//! - `backtester`: Fixed-fraction replay of a trader's recorded returns
//! - `risk-manager`: Threshold alerts with dedup and acknowledgement
//! - `portfolio-advisor`: Removal/increase candidates and the daily report
//! - `analytics-service`: Facade wiring storage into every component

pub use analytics_service as service;
pub use backtester as backtest;
pub use copytrade_core as core;
pub use portfolio_advisor as advisor;
pub use risk_manager as risk;
pub use wallet_tracker as scoring;
