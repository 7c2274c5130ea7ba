//! Trade ledger records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

/// An immutable trade from the persisted ledger.
///
/// `id` is the transaction hash the repository deduplicates on.
/// `timestamp` is unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub trader_id: String,
    pub asset: String,
    pub side: TradeSide,
    pub size_usd: Decimal,
    pub price_or_amount_in: Decimal,
    pub amount_out: Option<Decimal>,
    /// Signed realized P&L; `None` while unknown.
    pub profit_loss: Option<Decimal>,
    pub timestamp: i64,
}

impl Trade {
    /// Create a trade with no known P&L.
    pub fn new(
        id: impl Into<String>,
        trader_id: impl Into<String>,
        side: TradeSide,
        size_usd: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            trader_id: trader_id.into(),
            asset: String::new(),
            side,
            size_usd,
            price_or_amount_in: Decimal::ZERO,
            amount_out: None,
            profit_loss: None,
            timestamp,
        }
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = asset.into();
        self
    }

    pub fn with_amounts(mut self, amount_in: Decimal, amount_out: Option<Decimal>) -> Self {
        self.price_or_amount_in = amount_in;
        self.amount_out = amount_out;
        self
    }

    pub fn with_profit_loss(mut self, profit_loss: Decimal) -> Self {
        self.profit_loss = Some(profit_loss);
        self
    }

    pub fn is_win(&self) -> bool {
        self.profit_loss.map(|p| p > Decimal::ZERO).unwrap_or(false)
    }

    pub fn is_loss(&self) -> bool {
        self.profit_loss.map(|p| p < Decimal::ZERO).unwrap_or(false)
    }
}

/// Copy of `trades` in ascending timestamp order; ties keep input order.
pub fn sorted_by_time(trades: &[Trade]) -> Vec<Trade> {
    let mut sorted = trades.to_vec();
    sorted.sort_by_key(|t| t.timestamp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse() {
        assert_eq!(TradeSide::parse("buy"), Some(TradeSide::Buy));
        assert_eq!(TradeSide::parse("SELL"), Some(TradeSide::Sell));
        assert_eq!(TradeSide::parse("hold"), None);
    }

    #[test]
    fn test_win_loss_flags() {
        let base = Trade::new("0x1", "trader", TradeSide::Buy, Decimal::new(100, 0), 0);
        assert!(!base.is_win() && !base.is_loss());
        assert!(base.clone().with_profit_loss(Decimal::new(5, 0)).is_win());
        assert!(base.clone().with_profit_loss(Decimal::new(-5, 0)).is_loss());

        let flat = base.with_profit_loss(Decimal::ZERO);
        assert!(!flat.is_win() && !flat.is_loss());
    }

    #[test]
    fn test_sorted_by_time_is_stable() {
        let a = Trade::new("a", "t", TradeSide::Buy, Decimal::ONE, 20);
        let b = Trade::new("b", "t", TradeSide::Buy, Decimal::ONE, 10);
        let c = Trade::new("c", "t", TradeSide::Sell, Decimal::ONE, 20);

        let ids: Vec<String> = sorted_by_time(&[a, b, c])
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let trade = Trade::new("0x1", "trader", TradeSide::Sell, Decimal::ONE, 42)
            .with_profit_loss(Decimal::new(-3, 0));
        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["traderId"], "trader");
        assert_eq!(json["side"], "SELL");
        assert_eq!(json["timestamp"], 42);
    }
}
