//! Portfolio Advisor
//!
//! Batch removal/increase candidates and portfolio dispersion across every
//! tracked trader, rolled into a daily report.

pub mod advisor;
pub mod report;

pub use advisor::{AdvisorConfig, PortfolioAdvisor, PortfolioSummary, TraderFlag};
pub use report::{DailyReport, Performer, ReportRecommendations, ReportSummary};
