//! Performance metrics projected from a trader's ledger.
//!
//! Every function here ignores trades whose P&L is unknown and returns a
//! neutral value (zero or empty) instead of failing on sparse input.
//! Functions that walk the ledger in sequence expect trades in ascending
//! timestamp order; [`TradeMetrics::from_trades`] sorts before delegating.

use copytrade_core::types::{sorted_by_time, Trade};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Profit factor reported when there is profit but no loss at all.
pub const PROFIT_FACTOR_CAP: f64 = 10.0;

/// Trading days per year used to annualise the Sharpe ratio (24/7 venue).
const ANNUALIZATION_DAYS: f64 = 365.0;

/// Longest consecutive win and loss runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streaks {
    pub max_win_streak: u32,
    pub max_loss_streak: u32,
}

/// All aggregates for one trader, computed in one pass over a sorted copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeMetrics {
    /// Trades with known P&L.
    pub qualifying_trades: usize,
    pub win_rate_pct: f64,
    pub profit_factor: f64,
    pub daily_returns: Vec<f64>,
    pub streaks: Streaks,
    pub max_drawdown: Decimal,
}

impl TradeMetrics {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let ordered = sorted_by_time(trades);

        Self {
            qualifying_trades: ordered.iter().filter(|t| t.profit_loss.is_some()).count(),
            win_rate_pct: win_rate_pct(&ordered),
            profit_factor: profit_factor(&ordered),
            daily_returns: daily_returns(&ordered),
            streaks: streaks(&ordered),
            max_drawdown: max_drawdown(&ordered),
        }
    }
}

fn known_pnls(trades: &[Trade]) -> impl Iterator<Item = Decimal> + '_ {
    trades.iter().filter_map(|t| t.profit_loss)
}

/// Winning trades as a percentage of trades with known P&L.
pub fn win_rate_pct(trades: &[Trade]) -> f64 {
    let (wins, total) = known_pnls(trades).fold((0u64, 0u64), |(wins, total), pnl| {
        (wins + u64::from(pnl > Decimal::ZERO), total + 1)
    });

    if total == 0 {
        return 0.0;
    }
    wins as f64 / total as f64 * 100.0
}

/// Gross profit divided by gross loss.
///
/// No losses with some profit yields [`PROFIT_FACTOR_CAP`]; no profit and no
/// loss yields zero.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let (gross_profit, gross_loss) =
        known_pnls(trades).fold((Decimal::ZERO, Decimal::ZERO), |(profit, loss), pnl| {
            if pnl > Decimal::ZERO {
                (profit + pnl, loss)
            } else {
                (profit, loss + pnl.abs())
            }
        });

    if gross_loss > Decimal::ZERO {
        (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
    } else if gross_profit > Decimal::ZERO {
        PROFIT_FACTOR_CAP
    } else {
        0.0
    }
}

/// Net P&L per calendar day (`floor(timestamp / 86400)`), oldest day first.
///
/// Only days with at least one trade appear; quiet days are not zero-filled.
pub fn daily_returns(trades: &[Trade]) -> Vec<f64> {
    let mut by_day: BTreeMap<i64, Decimal> = BTreeMap::new();

    for trade in trades {
        if let Some(pnl) = trade.profit_loss {
            *by_day
                .entry(trade.timestamp.div_euclid(SECONDS_PER_DAY))
                .or_insert(Decimal::ZERO) += pnl;
        }
    }

    by_day
        .into_values()
        .map(|pnl| pnl.to_f64().unwrap_or(0.0))
        .collect()
}

/// Longest win and loss runs. Zero P&L counts as a loss.
pub fn streaks(trades: &[Trade]) -> Streaks {
    let mut result = Streaks::default();
    let mut current_win = 0u32;
    let mut current_loss = 0u32;

    for pnl in known_pnls(trades) {
        if pnl > Decimal::ZERO {
            current_win += 1;
            current_loss = 0;
            result.max_win_streak = result.max_win_streak.max(current_win);
        } else {
            current_loss += 1;
            current_win = 0;
            result.max_loss_streak = result.max_loss_streak.max(current_loss);
        }
    }

    result
}

/// Largest fall of cumulative P&L below its running peak, in currency units.
///
/// The peak starts at zero, so a ledger that opens with losses draws down
/// from break-even.
pub fn max_drawdown(trades: &[Trade]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut running = Decimal::ZERO;
    let mut max_dd = Decimal::ZERO;

    for pnl in known_pnls(trades) {
        running += pnl;
        if running > peak {
            peak = running;
        }
        max_dd = max_dd.max(peak - running);
    }

    max_dd
}

/// Annualised mean/stddev of daily returns (population stddev).
///
/// Zero when fewer than two days exist or returns never vary.
pub fn sharpe_ratio(daily_returns: &[f64]) -> f64 {
    if daily_returns.len() < 2 {
        return 0.0;
    }

    let mean = daily_returns.iter().mean();
    let std_dev = daily_returns.iter().population_std_dev();

    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0.0;
    }

    (mean / std_dev) * ANNUALIZATION_DAYS.sqrt()
}

/// Win rate (percent) over trades strictly older than `cutoff`.
///
/// Flat trades are excluded from both sides of the ratio. `None` when no
/// win or loss predates the cutoff, so callers can tell "no baseline" from
/// "zero percent".
pub fn historical_win_rate(trades: &[Trade], cutoff: i64) -> Option<f64> {
    let (wins, losses) = trades
        .iter()
        .filter(|t| t.timestamp < cutoff)
        .fold((0u64, 0u64), |(wins, losses), t| {
            (wins + u64::from(t.is_win()), losses + u64::from(t.is_loss()))
        });

    let total = wins + losses;
    if total == 0 {
        return None;
    }
    Some(wins as f64 / total as f64 * 100.0)
}
