//! Analytics Service
//!
//! Wires a trade repository and config store into the scoring, backtest,
//! alert and advisor components behind one facade, and drives them on a
//! schedule for the service binary.

pub mod config;
pub mod scheduler;
pub mod service;

pub use config::{ScheduleConfig, ServiceConfig};
pub use scheduler::Scheduler;
pub use service::AnalyticsService;
