//! Wallet Tracker
//!
//! Trade-history metrics and composite scoring for copy-traded wallets.

pub mod metrics;
pub mod scoring;

pub use metrics::{Streaks, TradeMetrics};
pub use scoring::{
    Grade, MetricScore, MetricValue, Rank, Recommendation, RecommendationAction, RiskLevel,
    RiskTier, Score, ScoreBreakdown, ScoredTrader, ScoringEngine, ScoringWeights,
};
