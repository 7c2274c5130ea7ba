//! Trade ledger backed by PostgreSQL.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::{validate_trader_id, Error, Result};
use crate::repository::TradeRepository;
use crate::types::{Trade, TradeSide, TraderStats};

/// Repository over the `tracked_traders` and `trades` tables.
pub struct PgTradeRepository {
    pool: PgPool,
}

impl PgTradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Start tracking a trader, updating the label if one is given.
    pub async fn track_trader(&self, trader_id: &str, label: Option<&str>) -> Result<()> {
        validate_trader_id(trader_id)?;

        sqlx::query(
            r#"
            INSERT INTO tracked_traders (trader_id, label)
            VALUES ($1, $2)
            ON CONFLICT (trader_id) DO UPDATE SET
                label = COALESCE(EXCLUDED.label, tracked_traders.label)
            "#,
        )
        .bind(trader_id)
        .bind(label)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a trade; returns `false` when the transaction hash already exists.
    pub async fn insert_trade(&self, trade: &Trade) -> Result<bool> {
        validate_trader_id(&trade.trader_id)?;
        if trade.id.is_empty() {
            return Err(Error::invalid_input("trade id is required"));
        }
        self.track_trader(&trade.trader_id, None).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO trades (
                tx_hash, trader_id, asset, side, size_usd,
                amount_in, amount_out, profit_loss, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tx_hash) DO NOTHING
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.trader_id)
        .bind(&trade.asset)
        .bind(trade.side.as_str())
        .bind(trade.size_usd)
        .bind(trade.price_or_amount_in)
        .bind(trade.amount_out)
        .bind(trade.profit_loss)
        .bind(trade.timestamp)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!(tx_hash = %trade.id, "Skipping duplicate trade");
        }
        Ok(inserted)
    }

    fn trade_from_row(row: &PgRow) -> Result<Trade> {
        let side_raw: String = row.try_get("side")?;
        let side = TradeSide::parse(&side_raw)
            .ok_or_else(|| Error::invalid_input(format!("unknown trade side {:?}", side_raw)))?;

        Ok(Trade {
            id: row.try_get("tx_hash")?,
            trader_id: row.try_get("trader_id")?,
            asset: row.try_get("asset")?,
            side,
            size_usd: row.try_get("size_usd")?,
            price_or_amount_in: row.try_get("amount_in")?,
            amount_out: row.try_get("amount_out")?,
            profit_loss: row.try_get("profit_loss")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

#[async_trait]
impl TradeRepository for PgTradeRepository {
    async fn list_trades(&self, trader_id: &str) -> Result<Vec<Trade>> {
        let rows = sqlx::query(
            r#"
            SELECT tx_hash, trader_id, asset, side, size_usd,
                   amount_in, amount_out, profit_loss, timestamp
            FROM trades
            WHERE trader_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(trader_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::trade_from_row).collect()
    }

    async fn list_all_trader_stats(&self) -> Result<Vec<TraderStats>> {
        let rows = sqlx::query(
            r#"
            SELECT a.trader_id,
                   a.label,
                   COUNT(t.id) AS trade_count,
                   COUNT(t.id) FILTER (WHERE t.profit_loss > 0) AS win_count,
                   COUNT(t.id) FILTER (WHERE t.profit_loss < 0) AS loss_count,
                   COUNT(t.profit_loss) AS known_count,
                   COALESCE(SUM(t.profit_loss), 0) AS total_profit_loss,
                   COALESCE(AVG(t.profit_loss), 0) AS avg_profit_loss,
                   MAX(t.timestamp) AS last_trade_at
            FROM tracked_traders a
            LEFT JOIN trades t ON t.trader_id = a.trader_id
            GROUP BY a.trader_id, a.label
            ORDER BY total_profit_loss DESC, a.trader_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TraderStats> {
                let win_count: i64 = row.try_get("win_count")?;
                let known_count: i64 = row.try_get("known_count")?;
                let win_rate_pct = if known_count > 0 {
                    win_count as f64 / known_count as f64 * 100.0
                } else {
                    0.0
                };

                Ok(TraderStats {
                    trader_id: row.try_get("trader_id")?,
                    label: row.try_get("label")?,
                    trade_count: row.try_get::<i64, _>("trade_count")? as u64,
                    win_count: win_count as u64,
                    loss_count: row.try_get::<i64, _>("loss_count")? as u64,
                    total_profit_loss: row.try_get("total_profit_loss")?,
                    avg_profit_loss: row.try_get("avg_profit_loss")?,
                    win_rate_pct,
                    last_trade_at: row.try_get("last_trade_at")?,
                })
            })
            .collect()
    }

    async fn list_recent_trades(
        &self,
        since: i64,
        max_loss_threshold: Decimal,
    ) -> Result<Vec<Trade>> {
        let rows = sqlx::query(
            r#"
            SELECT tx_hash, trader_id, asset, side, size_usd,
                   amount_in, amount_out, profit_loss, timestamp
            FROM trades
            WHERE timestamp > $1 AND profit_loss < $2
            ORDER BY timestamp DESC
            "#,
        )
        .bind(since)
        .bind(max_loss_threshold)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::trade_from_row).collect()
    }
}
