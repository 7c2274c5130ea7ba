//! Composite 0-100 trader scoring.
//!
//! Six sub-metrics are each mapped to a 0-100 sub-score and blended with
//! fixed weights. Sub-metrics that need more history than the trader has
//! report a neutral 50 with grade `N/A`, so sparse traders still score.
//! Scoring is a pure function of its inputs.

use copytrade_core::types::{Trade, TraderStats};
use copytrade_core::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::{self, Streaks, TradeMetrics};

/// Trades required before the Sharpe sub-metric is scored.
pub const MIN_TRADES_FOR_SHARPE: usize = 10;
/// Distinct trading days required before the Sharpe sub-metric is scored.
pub const MIN_DAYS_FOR_SHARPE: usize = 5;
pub const MIN_TRADES_FOR_CONSISTENCY: usize = 10;
pub const MIN_TRADES_FOR_RISK: usize = 5;

/// Drawdown, in currency units, that costs one risk-management point.
const DRAWDOWN_PER_POINT: f64 = 50.0;
const NEUTRAL_SCORE: f64 = 50.0;

/// Minimum overall score for a trader to appear in top recommendations.
pub const TOP_RECOMMENDATION_MIN_SCORE: u8 = 60;

/// Weights for the six sub-metrics.
///
/// Weights must be non-negative and sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub consistency: f64,
    pub risk_management: f64,
    pub activity: f64,
}

impl ScoringWeights {
    /// Profitability first, then risk adjustment; activity breaks ties.
    pub const DEFAULT: Self = Self {
        win_rate: 0.25,
        profit_factor: 0.25,
        sharpe_ratio: 0.20,
        consistency: 0.15,
        risk_management: 0.10,
        activity: 0.05,
    };

    fn as_array(&self) -> [f64; 6] {
        [
            self.win_rate,
            self.profit_factor,
            self.sharpe_ratio,
            self.consistency,
            self.risk_management,
            self.activity,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::config(
                "scoring weights must be finite and non-negative",
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::config(format!(
                "scoring weights sum to {} instead of 1.0",
                sum
            )));
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Letter grade for a sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    /// Not enough history to score the metric.
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Grade::A,
            s if s >= 80.0 => Grade::B,
            s if s >= 70.0 => Grade::C,
            s if s >= 60.0 => Grade::D,
            _ => Grade::F,
        }
    }
}

/// Raw statistic behind a sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Streaks(Streaks),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub score: f64,
    pub value: MetricValue,
    pub grade: Grade,
    pub description: String,
}

impl MetricScore {
    fn graded(score: f64, value: MetricValue, description: String) -> Self {
        let score = score.clamp(0.0, 100.0);
        Self {
            score,
            value,
            grade: Grade::from_score(score),
            description,
        }
    }

    fn insufficient(description: &str) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            value: MetricValue::Number(0.0),
            grade: Grade::NotAvailable,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub win_rate: MetricScore,
    pub profit_factor: MetricScore,
    pub sharpe_ratio: MetricScore,
    pub consistency: MetricScore,
    pub risk_management: MetricScore,
    pub activity: MetricScore,
}

impl ScoreBreakdown {
    /// Sub-metrics in weight order, keyed by their serialized names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &MetricScore)> {
        [
            ("winRate", &self.win_rate),
            ("profitFactor", &self.profit_factor),
            ("sharpeRatio", &self.sharpe_ratio),
            ("consistency", &self.consistency),
            ("riskManagement", &self.risk_management),
            ("activity", &self.activity),
        ]
        .into_iter()
    }

    fn weighted_total(&self, weights: &ScoringWeights) -> f64 {
        self.iter()
            .zip(weights.as_array())
            .map(|((_, metric), weight)| metric.score * weight)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tier for a blended Sharpe/drawdown/consistency score.
    pub fn from_blend(blend: f64) -> Self {
        if blend >= 80.0 {
            RiskTier::Low
        } else if blend >= 60.0 {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low risk",
            RiskTier::Medium => "Medium risk",
            RiskTier::High => "High risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevel {
    pub level: RiskTier,
    pub label: String,
}

impl RiskLevel {
    fn from_breakdown(metrics: &ScoreBreakdown) -> Self {
        let blend = metrics.sharpe_ratio.score * 0.4
            + metrics.risk_management.score * 0.4
            + metrics.consistency.score * 0.2;
        let level = RiskTier::from_blend(blend);
        Self {
            level,
            label: level.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    StrongBuy,
    Buy,
    Watch,
    Avoid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendationAction,
    pub text: String,
    pub reason: String,
}

impl Recommendation {
    pub fn for_overall(overall: u8) -> Self {
        let (action, text, reason) = match overall {
            85.. => (
                RecommendationAction::StrongBuy,
                "Strongly recommended to copy",
                "Excellent results with a strong risk/reward profile",
            ),
            70..=84 => (
                RecommendationAction::Buy,
                "Recommended to copy",
                "Solid performance worth following",
            ),
            50..=69 => (
                RecommendationAction::Watch,
                "Keep watching",
                "Average performance, monitor before copying",
            ),
            _ => (
                RecommendationAction::Avoid,
                "Not recommended",
                "Weak performance or elevated risk",
            ),
        };
        Self {
            action,
            text: text.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub percentile: u8,
    pub stars: u8,
}

impl Rank {
    pub fn for_overall(overall: u8) -> Self {
        let (stars, percentile) = match overall {
            90.. => (5, 95),
            80..=89 => (4, 85),
            70..=79 => (3, 70),
            60..=69 => (2, 50),
            _ => (1, 30),
        };
        Self { percentile, stars }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub overall: u8,
    pub metrics: ScoreBreakdown,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    pub rank: Rank,
}

/// Trader stats annotated with their score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrader {
    #[serde(flatten)]
    pub stats: TraderStats,
    pub score: Score,
}

/// Weighted scoring over trader stats and trade history.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one trader. `trades` may be in any order.
    pub fn calculate_score(&self, stats: &TraderStats, trades: &[Trade]) -> Score {
        let trade_metrics = TradeMetrics::from_trades(trades);

        let metrics = ScoreBreakdown {
            win_rate: score_win_rate(stats.win_rate_pct),
            profit_factor: score_profit_factor(trade_metrics.profit_factor),
            sharpe_ratio: score_sharpe(&trade_metrics),
            consistency: score_consistency(&trade_metrics),
            risk_management: score_risk_management(&trade_metrics),
            activity: score_activity(stats.trade_count),
        };

        let overall = metrics.weighted_total(&self.weights).round().clamp(0.0, 100.0) as u8;
        debug!(
            trader = %stats.trader_id,
            overall,
            trades = trades.len(),
            "Scored trader"
        );

        Score {
            overall,
            risk_level: RiskLevel::from_breakdown(&metrics),
            recommendation: Recommendation::for_overall(overall),
            rank: Rank::for_overall(overall),
            metrics,
        }
    }

    /// Score each trader against its own trade history, preserving input order.
    pub fn batch_score<I>(&self, traders: I) -> Vec<ScoredTrader>
    where
        I: IntoIterator<Item = (TraderStats, Vec<Trade>)>,
    {
        let scored: Vec<ScoredTrader> = traders
            .into_iter()
            .map(|(stats, trades)| {
                let score = self.calculate_score(&stats, &trades);
                ScoredTrader { stats, score }
            })
            .collect();
        debug!(count = scored.len(), "Batch scoring complete");
        scored
    }

    /// Best-scoring traders that are not high risk, highest first.
    pub fn top_recommendations(mut scored: Vec<ScoredTrader>, limit: usize) -> Vec<ScoredTrader> {
        scored.retain(|t| {
            t.score.overall >= TOP_RECOMMENDATION_MIN_SCORE
                && t.score.risk_level.level != RiskTier::High
        });
        scored.sort_by(|a, b| b.score.overall.cmp(&a.score.overall));
        scored.truncate(limit);
        scored
    }
}

fn score_win_rate(win_rate_pct: f64) -> MetricScore {
    MetricScore::graded(
        win_rate_pct,
        MetricValue::Number(win_rate_pct),
        format!("Win rate {:.1}%", win_rate_pct),
    )
}

fn score_profit_factor(profit_factor: f64) -> MetricScore {
    MetricScore::graded(
        50.0 + (profit_factor - 1.0) * 50.0,
        MetricValue::Number(profit_factor),
        format!("Profit factor {:.2}", profit_factor),
    )
}

fn score_sharpe(trade_metrics: &TradeMetrics) -> MetricScore {
    if trade_metrics.qualifying_trades < MIN_TRADES_FOR_SHARPE {
        return MetricScore::insufficient("Not enough trades to estimate Sharpe ratio");
    }
    if trade_metrics.daily_returns.len() < MIN_DAYS_FOR_SHARPE {
        return MetricScore::insufficient("Not enough trading days to estimate Sharpe ratio");
    }

    let sharpe = metrics::sharpe_ratio(&trade_metrics.daily_returns);
    MetricScore::graded(
        25.0 + sharpe * 37.5,
        MetricValue::Number(sharpe),
        format!("Sharpe ratio {:.2}", sharpe),
    )
}

fn score_consistency(trade_metrics: &TradeMetrics) -> MetricScore {
    if trade_metrics.qualifying_trades < MIN_TRADES_FOR_CONSISTENCY {
        return MetricScore::insufficient("Not enough trades to judge consistency");
    }

    let streaks = trade_metrics.streaks;
    let ratio = if streaks.max_loss_streak > 0 {
        f64::from(streaks.max_win_streak) / f64::from(streaks.max_loss_streak)
    } else {
        f64::from(streaks.max_win_streak)
    };

    MetricScore::graded(
        50.0 + ratio * 25.0,
        MetricValue::Streaks(streaks),
        format!(
            "Longest win streak {}, longest loss streak {}",
            streaks.max_win_streak, streaks.max_loss_streak
        ),
    )
}

fn score_risk_management(trade_metrics: &TradeMetrics) -> MetricScore {
    if trade_metrics.qualifying_trades < MIN_TRADES_FOR_RISK {
        return MetricScore::insufficient("Not enough trades to measure drawdown");
    }

    let drawdown = trade_metrics.max_drawdown.to_f64().unwrap_or(0.0);
    MetricScore::graded(
        100.0 - drawdown / DRAWDOWN_PER_POINT,
        MetricValue::Number(drawdown),
        format!("Max drawdown ${:.2}", drawdown),
    )
}

/// Piecewise activity score: few trades score low, overtrading is penalised.
pub fn activity_score(trade_count: u64) -> f64 {
    let n = trade_count as f64;
    match trade_count {
        0..=9 => 30.0,
        10..=29 => 50.0 + (n - 10.0) * 1.5,
        30..=99 => 80.0 + (n - 30.0) * 0.28,
        100..=499 => 100.0,
        _ => 90.0,
    }
}

fn score_activity(trade_count: u64) -> MetricScore {
    MetricScore::graded(
        activity_score(trade_count),
        MetricValue::Number(trade_count as f64),
        format!("{} trades", trade_count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytrade_core::types::TradeSide;
    use rust_decimal::Decimal;

    fn make_trade(i: i64, pnl: i64, ts: i64) -> Trade {
        Trade::new(
            format!("0xtx{}", i),
            "0xtrader",
            TradeSide::Buy,
            Decimal::new(100, 0),
            ts,
        )
        .with_profit_loss(Decimal::new(pnl, 0))
    }

    /// One trade per day with the given P&L values.
    fn daily_trades(pnls: &[i64]) -> Vec<Trade> {
        pnls.iter()
            .enumerate()
            .map(|(i, &p)| make_trade(i as i64, p, i as i64 * 86_400 + 3_600))
            .collect()
    }

    fn score(trades: &[Trade]) -> Score {
        let stats = TraderStats::from_trades("0xtrader", trades);
        ScoringEngine::new().calculate_score(&stats, trades)
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoringWeights::DEFAULT;
        let sum = w.win_rate
            + w.profit_factor
            + w.sharpe_ratio
            + w.consistency
            + w.risk_management
            + w.activity;
        assert!((sum - 1.0).abs() < 1e-9, "weights sum to {}", sum);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut w = ScoringWeights::DEFAULT;
        w.activity = 0.5;
        assert!(ScoringEngine::with_weights(w).is_err());

        let mut w = ScoringWeights::DEFAULT;
        w.win_rate = -0.25;
        w.profit_factor = 0.75;
        assert!(ScoringEngine::with_weights(w).is_err());
    }

    #[test]
    fn test_profit_factor_scenario_saturates() {
        let trades = vec![
            make_trade(1, 100, 10),
            make_trade(2, -50, 20),
            make_trade(3, 200, 30),
        ];
        let score = score(&trades);

        assert_eq!(score.metrics.profit_factor.score, 100.0);
        assert_eq!(score.metrics.profit_factor.value, MetricValue::Number(6.0));
        assert!((score.metrics.win_rate.score - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_sparse_trader_gets_neutral_metrics() {
        let trades = vec![make_trade(1, 10, 10), make_trade(2, -5, 20)];
        let score = score(&trades);

        for metric in [
            &score.metrics.sharpe_ratio,
            &score.metrics.consistency,
            &score.metrics.risk_management,
        ] {
            assert_eq!(metric.score, 50.0);
            assert_eq!(metric.grade, Grade::NotAvailable);
        }
        assert_eq!(score.metrics.activity.score, 30.0);
    }

    #[test]
    fn test_sharpe_needs_five_trading_days() {
        // Twelve trades squeezed into two days.
        let trades: Vec<Trade> = (0..12)
            .map(|i| make_trade(i, if i % 3 == 0 { -10 } else { 20 }, (i % 2) * 86_400 + i))
            .collect();
        let score = score(&trades);

        assert_eq!(score.metrics.sharpe_ratio.grade, Grade::NotAvailable);
        assert_ne!(score.metrics.consistency.grade, Grade::NotAvailable);
    }

    #[test]
    fn test_sharpe_scored_with_enough_history() {
        let trades = daily_trades(&[50, -20, 30, 40, -10, 60, 20, -30, 70, 10]);
        let score = score(&trades);
        let sharpe = &score.metrics.sharpe_ratio;

        assert_ne!(sharpe.grade, Grade::NotAvailable);
        match sharpe.value {
            MetricValue::Number(v) => assert!(v > 0.0),
            _ => panic!("sharpe value should be numeric"),
        }
    }

    #[test]
    fn test_consistency_without_losses_uses_win_streak() {
        let trades = daily_trades(&[10; 12]);
        let score = score(&trades);

        // ratio = 12 -> 50 + 300 clamps to 100
        assert_eq!(score.metrics.consistency.score, 100.0);
        assert_eq!(
            score.metrics.consistency.value,
            MetricValue::Streaks(Streaks {
                max_win_streak: 12,
                max_loss_streak: 0
            })
        );
    }

    #[test]
    fn test_risk_management_costs_one_point_per_fifty() {
        // Peak 100, then down 1000 -> drawdown 1000 -> 100 - 20 = 80.
        let trades = daily_trades(&[100, -400, -300, -300, 50]);
        let score = score(&trades);
        assert_eq!(score.metrics.risk_management.score, 80.0);
        assert_eq!(score.metrics.risk_management.grade, Grade::B);
    }

    #[test]
    fn test_deep_drawdown_is_high_risk_despite_strong_score() {
        // One big win, a 10k giveback, then four months of small wins.
        let mut pnls = vec![20_000, -10_000];
        pnls.extend([50; 118]);
        let score = score(&daily_trades(&pnls));

        assert!(score.metrics.win_rate.score > 99.0);
        assert_eq!(score.metrics.profit_factor.score, 100.0);
        assert_eq!(score.metrics.risk_management.score, 0.0);
        assert!(score.metrics.sharpe_ratio.score < 80.0);

        assert!(score.overall >= 70);
        assert_eq!(score.risk_level.level, RiskTier::High);
        assert_eq!(score.recommendation.action, RecommendationAction::Buy);
    }

    #[test]
    fn test_activity_piecewise() {
        assert_eq!(activity_score(0), 30.0);
        assert_eq!(activity_score(9), 30.0);
        assert_eq!(activity_score(10), 50.0);
        assert_eq!(activity_score(20), 65.0);
        assert_eq!(activity_score(30), 80.0);
        assert!((activity_score(99) - 99.32).abs() < 1e-9);
        assert_eq!(activity_score(100), 100.0);
        assert_eq!(activity_score(499), 100.0);
        assert_eq!(activity_score(500), 90.0);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskTier::from_blend(80.0), RiskTier::Low);
        assert_eq!(RiskTier::from_blend(79.9), RiskTier::Medium);
        assert_eq!(RiskTier::from_blend(60.0), RiskTier::Medium);
        assert_eq!(RiskTier::from_blend(59.9), RiskTier::High);

        assert_eq!(Recommendation::for_overall(85).action, RecommendationAction::StrongBuy);
        assert_eq!(Recommendation::for_overall(84).action, RecommendationAction::Buy);
        assert_eq!(Recommendation::for_overall(50).action, RecommendationAction::Watch);
        assert_eq!(Recommendation::for_overall(49).action, RecommendationAction::Avoid);

        assert_eq!(Rank::for_overall(90), Rank { percentile: 95, stars: 5 });
        assert_eq!(Rank::for_overall(60), Rank { percentile: 50, stars: 2 });
        assert_eq!(Rank::for_overall(0), Rank { percentile: 30, stars: 1 });
    }

    #[test]
    fn test_calculate_score_is_pure() {
        let trades = daily_trades(&[50, -20, 30, 40, -10, 60, 20, -30, 70, 10, 5]);
        let stats = TraderStats::from_trades("0xtrader", &trades);
        let engine = ScoringEngine::new();

        assert_eq!(
            engine.calculate_score(&stats, &trades),
            engine.calculate_score(&stats, &trades)
        );
    }

    #[test]
    fn test_overall_and_stars_in_range() {
        // Deterministic pseudo-random ledgers of varying size and skew.
        let mut seed: i64 = 17;
        for len in [0usize, 1, 4, 9, 15, 40, 120, 600] {
            let trades: Vec<Trade> = (0..len)
                .map(|i| {
                    seed = (seed * 1_103_515_245 + 12_345) % 2_147_483_648;
                    let pnl = seed % 2_001 - 1_000;
                    make_trade(i as i64, pnl, i as i64 * 40_000)
                })
                .collect();
            let score = score(&trades);

            assert!(score.overall <= 100);
            assert!((1..=5).contains(&score.rank.stars));
            for (name, metric) in score.metrics.iter() {
                assert!(
                    (0.0..=100.0).contains(&metric.score),
                    "{} out of range: {}",
                    name,
                    metric.score
                );
            }
        }
    }

    #[test]
    fn test_top_recommendations_filters_and_orders() {
        let engine = ScoringEngine::new();
        let strong = daily_trades(&[100, 80, 120, 90, 110, 95, 105, 100, 85, 115, -10, 100]);
        let weak = daily_trades(&[-100, -80, 20, -90, -110, 10, -105, -100, -85, -115, -10]);

        let scored = engine.batch_score(vec![
            (TraderStats::from_trades("0xweak", &weak), weak),
            (TraderStats::from_trades("0xstrong", &strong), strong),
        ]);
        assert_eq!(scored[0].stats.trader_id, "0xweak");

        let top = ScoringEngine::top_recommendations(scored, 10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].stats.trader_id, "0xstrong");
        assert!(top[0].score.overall >= TOP_RECOMMENDATION_MIN_SCORE);
        assert_ne!(top[0].score.risk_level.level, RiskTier::High);
    }

    #[test]
    fn test_score_serializes_with_wire_names() {
        let trades = vec![make_trade(1, 10, 10)];
        let json = serde_json::to_value(score(&trades)).unwrap();

        assert_eq!(json["metrics"]["sharpeRatio"]["grade"], "N/A");
        assert!(json["riskLevel"]["level"].is_string());
        assert!(json["rank"]["stars"].is_u64());
    }
}
