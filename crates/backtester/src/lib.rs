//! Backtester
//!
//! Replays a trader's recorded returns against a synthetic capital account.
//!
//! # Features
//!
//! - **Fixed-fraction sizing**: every trade risks a constant share of current capital
//! - **Equity curve**: one capital point per replayed trade
//! - **Risk statistics**: drawdown, per-step Sharpe ratio and profit factor
//!
//! # Example
//!
//! ```ignore
//! use backtester::{BacktestOutcome, BacktestSimulator, SimulatorConfig};
//!
//! let simulator = BacktestSimulator::new(SimulatorConfig::default())?;
//! if let BacktestOutcome::Completed(result) = simulator.run(&trades) {
//!     println!("Return: {:.2}%", result.total_return_pct);
//! }
//! ```

pub mod simulator;

pub use simulator::{
    BacktestOutcome, BacktestResult, BacktestSimulator, BacktestVerdict, EquityPoint,
    ProfitFactorMode, SimulatorConfig,
};
