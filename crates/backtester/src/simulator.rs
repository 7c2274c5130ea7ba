//! Fixed-fraction replay of a trader's recorded returns.
//!
//! Each trade's `profit_loss` is read as a percentage return on a position
//! worth `position_fraction` of current capital. Positions never overlap.

use copytrade_core::types::{sorted_by_time, Trade};
use copytrade_core::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, warn};

/// Cap reported when a run has simulated profit but no simulated loss.
const PROFIT_FACTOR_CAP: f64 = 10.0;

/// How `BacktestResult::profit_factor` is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactorMode {
    /// Gross simulated profit over gross simulated loss, capped at 10.
    #[default]
    GrossPnl,
    /// Winning trades over losing trades (wins when there are no losses).
    WinLossRatio,
}

/// Configuration for the backtest simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Starting account value.
    pub initial_capital: Decimal,
    /// Share of current capital committed to each trade.
    pub position_fraction: Decimal,
    pub profit_factor_mode: ProfitFactorMode,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::new(1000, 0),
            position_fraction: Decimal::new(10, 2), // 10%
            profit_factor_mode: ProfitFactorMode::GrossPnl,
        }
    }
}

impl SimulatorConfig {
    pub fn with_initial_capital(mut self, initial_capital: Decimal) -> Self {
        self.initial_capital = initial_capital;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(Error::invalid_input(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.position_fraction <= Decimal::ZERO || self.position_fraction > Decimal::ONE {
            return Err(Error::invalid_input(format!(
                "position fraction must be in (0, 1], got {}",
                self.position_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestVerdict {
    /// Return above 50% with a win rate above 60%.
    StrongBuy,
    /// Profitable, but copy with position limits.
    Acceptable,
    Avoid,
}

impl BacktestVerdict {
    fn judge(total_return_pct: f64, win_rate_pct: f64) -> Self {
        if total_return_pct > 50.0 && win_rate_pct > 60.0 {
            BacktestVerdict::StrongBuy
        } else if total_return_pct > 0.0 {
            BacktestVerdict::Acceptable
        } else {
            BacktestVerdict::Avoid
        }
    }
}

/// Capital after a replayed trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub capital: Decimal,
}

/// Result of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub total_return_pct: f64,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Wins over every replayed trade, in percent.
    pub win_rate_pct: f64,
    /// `(max capital - min capital) / max capital`, in percent.
    pub max_drawdown_pct: f64,
    /// Mean over stddev of per-step returns, not annualised.
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub verdict: BacktestVerdict,
    /// Timestamp of the first trade whose replay would overflow the capital
    /// account. Capital stays frozen from that trade on; win and loss counts
    /// still cover every trade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_overflow_at: Option<i64>,
}

impl BacktestResult {
    pub fn is_profitable(&self) -> bool {
        self.final_capital > self.initial_capital
    }
}

/// Outcome of a run; an empty ledger is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestOutcome {
    NoTradeHistory,
    Completed(BacktestResult),
}

impl BacktestOutcome {
    pub fn result(&self) -> Option<&BacktestResult> {
        match self {
            BacktestOutcome::Completed(result) => Some(result),
            BacktestOutcome::NoTradeHistory => None,
        }
    }

    pub fn final_capital(&self) -> Option<Decimal> {
        self.result().map(|r| r.final_capital)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    config: SimulatorConfig,
}

impl BacktestSimulator {
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Replay `trades` in timestamp order. Unknown P&L replays as a flat trade.
    pub fn run(&self, trades: &[Trade]) -> BacktestOutcome {
        if trades.is_empty() {
            return BacktestOutcome::NoTradeHistory;
        }

        let ordered = sorted_by_time(trades);
        let initial = self.config.initial_capital;

        let mut state = SimulationState::new(initial);
        for trade in &ordered {
            state.apply(trade, self.config.position_fraction);
        }

        let total_trades = ordered.len();
        let total_return_pct = match state.capital.checked_sub(initial) {
            Some(gain) => pct(gain, initial),
            None => pct_f64(state.capital, initial, initial),
        };
        let win_rate_pct = state.wins as f64 / total_trades as f64 * 100.0;
        let max_drawdown_pct = match state.max_capital.checked_sub(state.min_capital) {
            Some(spread) => pct(spread, state.max_capital),
            None => pct_f64(state.max_capital, state.min_capital, state.max_capital),
        };
        let sharpe_ratio = step_sharpe(&state.step_returns);
        let profit_factor = match self.config.profit_factor_mode {
            ProfitFactorMode::GrossPnl => state.gross_profit_factor(),
            ProfitFactorMode::WinLossRatio => state.win_loss_ratio(),
        };

        debug!(
            trades = total_trades,
            final_capital = %state.capital,
            total_return_pct,
            "Backtest completed"
        );

        BacktestOutcome::Completed(BacktestResult {
            initial_capital: initial,
            final_capital: state.capital,
            total_return_pct,
            total_trades,
            wins: state.wins,
            losses: state.losses,
            win_rate_pct,
            max_drawdown_pct,
            sharpe_ratio,
            profit_factor,
            equity_curve: state.equity_curve,
            verdict: BacktestVerdict::judge(total_return_pct, win_rate_pct),
            capital_overflow_at: state.overflow_at,
        })
    }
}

/// Running account state during one replay.
struct SimulationState {
    capital: Decimal,
    max_capital: Decimal,
    min_capital: Decimal,
    wins: usize,
    losses: usize,
    gross_profit: Decimal,
    gross_loss: Decimal,
    step_returns: Vec<f64>,
    equity_curve: Vec<EquityPoint>,
    overflow_at: Option<i64>,
}

impl SimulationState {
    fn new(initial_capital: Decimal) -> Self {
        Self {
            capital: initial_capital,
            max_capital: initial_capital,
            min_capital: initial_capital,
            wins: 0,
            losses: 0,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            step_returns: Vec::new(),
            equity_curve: Vec::new(),
            overflow_at: None,
        }
    }

    fn apply(&mut self, trade: &Trade, position_fraction: Decimal) {
        let pnl_pct = trade.profit_loss.unwrap_or(Decimal::ZERO);
        if pnl_pct > Decimal::ZERO {
            self.wins += 1;
        } else if pnl_pct < Decimal::ZERO {
            self.losses += 1;
        }

        let before = self.capital;
        let step = if self.overflow_at.is_some() {
            None
        } else {
            before
                .checked_mul(position_fraction)
                .and_then(|position| (pnl_pct / Decimal::ONE_HUNDRED).checked_mul(position))
                .and_then(|realized| before.checked_add(realized).map(|after| (realized, after)))
        };

        match step {
            Some((realized, after)) => {
                self.capital = after;
                if realized > Decimal::ZERO {
                    self.gross_profit = self.gross_profit.saturating_add(realized);
                } else {
                    self.gross_loss = self.gross_loss.saturating_add(realized.abs());
                }
                self.step_returns.push(if before > Decimal::ZERO {
                    pct(realized, before)
                } else {
                    0.0
                });
            }
            None => {
                if self.overflow_at.is_none() {
                    warn!(
                        trade_id = %trade.id,
                        capital = %before,
                        "Backtest capital overflowed, freezing the account"
                    );
                    self.overflow_at = Some(trade.timestamp);
                }
                self.step_returns.push(0.0);
            }
        }

        self.max_capital = self.max_capital.max(self.capital);
        self.min_capital = self.min_capital.min(self.capital);
        self.equity_curve.push(EquityPoint {
            timestamp: trade.timestamp,
            capital: self.capital,
        });
    }

    fn gross_profit_factor(&self) -> f64 {
        if self.gross_loss > Decimal::ZERO {
            self.gross_profit
                .checked_div(self.gross_loss)
                .and_then(|ratio| ratio.to_f64())
                .unwrap_or(PROFIT_FACTOR_CAP)
                .min(PROFIT_FACTOR_CAP)
        } else if self.gross_profit > Decimal::ZERO {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        }
    }

    fn win_loss_ratio(&self) -> f64 {
        if self.losses > 0 {
            self.wins as f64 / self.losses as f64
        } else {
            self.wins as f64
        }
    }
}

fn pct(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|p| p.to_f64())
        .unwrap_or_else(|| {
            let whole = whole.to_f64().unwrap_or(0.0);
            if whole == 0.0 {
                return 0.0;
            }
            part.to_f64().unwrap_or(0.0) / whole * 100.0
        })
}

/// `(a - b) / whole` in percent for spreads too wide for `Decimal`.
fn pct_f64(a: Decimal, b: Decimal, whole: Decimal) -> f64 {
    let whole = whole.to_f64().unwrap_or(0.0);
    if whole == 0.0 {
        return 0.0;
    }
    (a.to_f64().unwrap_or(0.0) - b.to_f64().unwrap_or(0.0)) / whole * 100.0
}

fn step_sharpe(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().mean();
    let std_dev = returns.iter().population_std_dev();
    if std_dev.is_finite() && std_dev > 0.0 {
        mean / std_dev
    } else {
        0.0
    }
}
