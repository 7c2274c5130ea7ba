//! Per-trader aggregate statistics.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::trade::Trade;

/// Aggregate projection of one trader's ledger.
///
/// Trades with unknown P&L count toward `trade_count` only. Trades with zero
/// P&L are neither wins nor losses, so `win_count + loss_count <= trade_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderStats {
    pub trader_id: String,
    pub label: Option<String>,
    pub trade_count: u64,
    pub win_count: u64,
    pub loss_count: u64,
    pub total_profit_loss: Decimal,
    pub avg_profit_loss: Decimal,
    /// Wins over trades with known P&L, in percent (0-100).
    pub win_rate_pct: f64,
    pub last_trade_at: Option<i64>,
}

impl TraderStats {
    /// Stats for a trader with no trades.
    pub fn empty(trader_id: impl Into<String>) -> Self {
        Self {
            trader_id: trader_id.into(),
            label: None,
            trade_count: 0,
            win_count: 0,
            loss_count: 0,
            total_profit_loss: Decimal::ZERO,
            avg_profit_loss: Decimal::ZERO,
            win_rate_pct: 0.0,
            last_trade_at: None,
        }
    }

    /// Project a trade list into stats.
    pub fn from_trades(trader_id: impl Into<String>, trades: &[Trade]) -> Self {
        let mut stats = Self::empty(trader_id);
        stats.trade_count = trades.len() as u64;

        let mut known = 0u64;
        for trade in trades {
            if let Some(pnl) = trade.profit_loss {
                known += 1;
                stats.total_profit_loss += pnl;
                if pnl > Decimal::ZERO {
                    stats.win_count += 1;
                } else if pnl < Decimal::ZERO {
                    stats.loss_count += 1;
                }
            }
        }

        if known > 0 {
            stats.avg_profit_loss = stats.total_profit_loss / Decimal::from(known);
            stats.win_rate_pct = stats.win_count as f64 / known as f64 * 100.0;
        }
        stats.last_trade_at = trades.iter().map(|t| t.timestamp).max();

        stats
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    /// Wins over every trade (including unknown P&L) as a 0-1 fraction.
    pub fn raw_win_ratio(&self) -> f64 {
        if self.trade_count == 0 {
            return 0.0;
        }
        self.win_count as f64 / self.trade_count as f64
    }

    pub fn total_profit_loss_f64(&self) -> f64 {
        self.total_profit_loss.to_f64().unwrap_or(0.0)
    }

    /// Display name used in alert and report text.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.trader_id)
    }
}
