//! Read access to the persisted trade ledger.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{validate_trader_id, Error, Result};
use crate::types::{sorted_by_time, Trade, TraderStats};

/// Trade ledger queries the analytics engine depends on.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// All trades for a trader in ascending timestamp order.
    async fn list_trades(&self, trader_id: &str) -> Result<Vec<Trade>>;

    /// Stats for every tracked trader, highest total P&L first.
    async fn list_all_trader_stats(&self) -> Result<Vec<TraderStats>>;

    /// Trades newer than `since` (exclusive) whose P&L is below
    /// `max_loss_threshold`, newest first.
    async fn list_recent_trades(
        &self,
        since: i64,
        max_loss_threshold: Decimal,
    ) -> Result<Vec<Trade>>;
}

#[derive(Debug, Default)]
struct TrackedTrader {
    label: Option<String>,
    trades: Vec<Trade>,
}

/// In-memory ledger for tests and embedded hosts.
#[derive(Default)]
pub struct MemoryTradeRepository {
    traders: DashMap<String, TrackedTrader>,
    seen_ids: DashSet<String>,
}

impl MemoryTradeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a trader, updating the label if already tracked.
    pub fn track_trader(&self, trader_id: &str, label: Option<String>) -> Result<()> {
        validate_trader_id(trader_id)?;
        let mut entry = self.traders.entry(trader_id.to_string()).or_default();
        if label.is_some() {
            entry.label = label;
        }
        Ok(())
    }

    /// Stop tracking a trader and drop its trades.
    pub fn untrack_trader(&self, trader_id: &str) -> bool {
        match self.traders.remove(trader_id) {
            Some((_, tracked)) => {
                for trade in &tracked.trades {
                    self.seen_ids.remove(&trade.id);
                }
                true
            }
            None => false,
        }
    }

    /// Record a trade. Returns `false` when the trade id was already seen.
    pub fn insert_trade(&self, trade: Trade) -> Result<bool> {
        validate_trader_id(&trade.trader_id)?;
        if trade.id.is_empty() {
            return Err(Error::invalid_input("trade id is required"));
        }
        if !self.seen_ids.insert(trade.id.clone()) {
            debug!(trade_id = %trade.id, "Skipping duplicate trade");
            return Ok(false);
        }

        self.traders
            .entry(trade.trader_id.clone())
            .or_default()
            .trades
            .push(trade);
        Ok(true)
    }

    pub fn trader_count(&self) -> usize {
        self.traders.len()
    }
}

#[async_trait]
impl TradeRepository for MemoryTradeRepository {
    async fn list_trades(&self, trader_id: &str) -> Result<Vec<Trade>> {
        Ok(self
            .traders
            .get(trader_id)
            .map(|tracked| sorted_by_time(&tracked.trades))
            .unwrap_or_default())
    }

    async fn list_all_trader_stats(&self) -> Result<Vec<TraderStats>> {
        let mut stats: Vec<TraderStats> = self
            .traders
            .iter()
            .map(|entry| {
                TraderStats::from_trades(entry.key().clone(), &entry.trades)
                    .with_label(entry.label.clone())
            })
            .collect();

        stats.sort_by(|a, b| {
            b.total_profit_loss
                .cmp(&a.total_profit_loss)
                .then_with(|| a.trader_id.cmp(&b.trader_id))
        });
        Ok(stats)
    }

    async fn list_recent_trades(
        &self,
        since: i64,
        max_loss_threshold: Decimal,
    ) -> Result<Vec<Trade>> {
        let mut recent: Vec<Trade> = self
            .traders
            .iter()
            .flat_map(|entry| {
                entry
                    .trades
                    .iter()
                    .filter(|t| {
                        t.timestamp > since
                            && t.profit_loss.map(|p| p < max_loss_threshold).unwrap_or(false)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(recent)
    }
}
