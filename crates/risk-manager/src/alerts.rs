//! Rule-based alerting over trader stats and recent trades.
//!
//! Each evaluation pass builds candidate alerts, drops candidates that
//! repeat a recent alert for the same trader, type and metric, appends the
//! survivors to a bounded history and hands them to every subscriber.

use copytrade_core::store::ConfigStore;
use copytrade_core::types::{Trade, TraderStats};
use copytrade_core::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::thresholds::{AlertThresholds, ThresholdKind, ThresholdUpdate};

/// Fixed low-win-rate rule: below 30% after at least 20 trades.
const LOW_WIN_RATE_PCT: f64 = 30.0;
const LOW_WIN_RATE_MIN_TRADES: u64 = 20;

/// Fixed high-performer rule: over $10,000 total P&L with a win rate above 60%.
const HIGH_PERFORMER_PNL: f64 = 10_000.0;
const HIGH_PERFORMER_WIN_RATE_PCT: f64 = 60.0;

/// Engine sizing and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertEngineConfig {
    /// Alerts retained in history; oldest are evicted first.
    pub history_capacity: usize,
    /// Trailing history entries a candidate is checked against.
    pub dedup_lookback: usize,
    /// Seconds during which a matching alert suppresses a candidate.
    pub dedup_window_secs: i64,
    /// Maximum unacknowledged alerts returned by `active_alerts`.
    pub active_limit: usize,
    /// Trades older than this form the win-rate baseline.
    pub baseline_age_secs: i64,
    /// Rolling window scanned by the single-loss rule.
    pub single_loss_window_secs: i64,
    /// Newest qualifying trades considered per pass by the single-loss rule.
    pub single_loss_scan_limit: usize,
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            dedup_lookback: 50,
            dedup_window_secs: 3600,
            active_limit: 50,
            baseline_age_secs: 7 * 86_400,
            single_loss_window_secs: 3600,
            single_loss_scan_limit: 50,
        }
    }
}

impl AlertEngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(Error::config("alert history capacity must be positive"));
        }
        if self.dedup_window_secs < 0
            || self.baseline_age_secs < 0
            || self.single_loss_window_secs < 0
        {
            return Err(Error::config("alert engine windows must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertMetric {
    WinRate,
    CumulativeLoss,
    LowWinRate,
    HighPerformer,
    SingleLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub icon: String,
    pub title: String,
    pub description: String,
    pub trader_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
    pub metric: AlertMetric,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub acknowledged: bool,
}

impl Alert {
    fn new(
        timestamp: i64,
        alert_type: AlertType,
        metric: AlertMetric,
        trader_id: &str,
        value: f64,
    ) -> Self {
        let (icon, title) = match metric {
            AlertMetric::WinRate => ("⚠️", "Win rate drop"),
            AlertMetric::CumulativeLoss => ("🔴", "Cumulative loss limit exceeded"),
            AlertMetric::LowWinRate => ("📉", "Low win rate"),
            AlertMetric::HighPerformer => ("🚀", "Strong performance"),
            AlertMetric::SingleLoss => ("💸", "Large losing trade"),
        };
        Self {
            id: Uuid::new_v4(),
            timestamp,
            alert_type,
            icon: icon.to_string(),
            title: title.to_string(),
            description: String::new(),
            trader_id: trader_id.to_string(),
            trade_id: None,
            metric,
            value,
            threshold: None,
            acknowledged: false,
        }
    }

    fn describe(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Whether this alert suppresses `candidate` within `window_secs`.
    fn repeats(&self, candidate: &Alert, window_secs: i64) -> bool {
        self.trader_id == candidate.trader_id
            && self.alert_type == candidate.alert_type
            && self.metric == candidate.metric
            && self.timestamp > candidate.timestamp - window_secs
    }
}

/// One trader as seen by an evaluation pass.
#[derive(Debug, Clone)]
pub struct AlertSubject {
    pub stats: TraderStats,
    /// Win rate over trades older than the baseline age; `None` when there
    /// were none, which disables the drop rule for this trader.
    pub historical_win_rate: Option<f64>,
}

impl AlertSubject {
    pub fn new(stats: TraderStats, historical_win_rate: Option<f64>) -> Self {
        Self {
            stats,
            historical_win_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTypeCounts {
    pub danger: usize,
    pub warning: usize,
    pub success: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub active: usize,
    /// Active alerts by type.
    pub by_type: AlertTypeCounts,
}

pub type AlertListener = Arc<dyn Fn(&[Alert]) + Send + Sync>;

/// Handle returned by [`AlertEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Stateful alert evaluator.
pub struct AlertEngine {
    config: AlertEngineConfig,
    store: Arc<dyn ConfigStore>,
    thresholds: RwLock<AlertThresholds>,
    history: RwLock<VecDeque<Alert>>,
    listeners: RwLock<Vec<(SubscriptionId, AlertListener)>>,
    next_subscription: AtomicU64,
}

impl AlertEngine {
    /// Build an engine with thresholds read from `store`.
    ///
    /// An unreachable or corrupt store leaves the default thresholds active.
    pub async fn load(store: Arc<dyn ConfigStore>, config: AlertEngineConfig) -> Result<Self> {
        config.validate()?;
        let thresholds = AlertThresholds::load(store.as_ref()).await;

        Ok(Self {
            history: RwLock::new(VecDeque::with_capacity(config.history_capacity)),
            config,
            store,
            thresholds: RwLock::new(thresholds),
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &AlertEngineConfig {
        &self.config
    }

    /// Query bounds for the single-loss rule at `now`: trades after the
    /// returned timestamp with P&L below the returned threshold. `None` while
    /// the rule is disabled.
    pub async fn single_loss_window(&self, now: i64) -> Option<(i64, Decimal)> {
        let thresholds = self.thresholds.read().await;
        if !thresholds.single_loss.enabled {
            return None;
        }
        let max_loss = Decimal::try_from(-thresholds.single_loss.value).unwrap_or(Decimal::MIN);
        Some((now - self.config.single_loss_window_secs, max_loss))
    }

    /// Run every rule once and return the alerts that survived dedup.
    pub async fn evaluate(
        &self,
        subjects: &[AlertSubject],
        recent_trades: &[Trade],
        now: i64,
    ) -> Vec<Alert> {
        let thresholds = self.thresholds.read().await.clone();

        let mut candidates = Vec::new();
        for subject in subjects {
            self.check_trader(&thresholds, subject, now, &mut candidates);
        }
        self.check_recent_trades(&thresholds, subjects, recent_trades, now, &mut candidates);

        let new_alerts = {
            let mut history = self.history.write().await;
            let fresh = self.deduplicate(&history, candidates);
            history.extend(fresh.iter().cloned());
            while history.len() > self.config.history_capacity {
                history.pop_front();
            }
            fresh
        };

        info!(
            traders = subjects.len(),
            new_alerts = new_alerts.len(),
            "Alert evaluation complete"
        );

        if !new_alerts.is_empty() {
            self.notify(&new_alerts).await;
        }
        new_alerts
    }

    fn check_trader(
        &self,
        thresholds: &AlertThresholds,
        subject: &AlertSubject,
        now: i64,
        out: &mut Vec<Alert>,
    ) {
        let stats = &subject.stats;
        let name = stats.display_name();
        let win_rate = stats.win_rate_pct;
        let total_pnl = stats.total_profit_loss_f64();

        let drop_rule = &thresholds.win_rate_drop;
        if drop_rule.enabled && stats.trade_count >= drop_rule.min_trades.unwrap_or(0) {
            if let Some(baseline) = subject.historical_win_rate.filter(|b| *b > 0.0) {
                let floor = baseline - drop_rule.value;
                if win_rate < floor {
                    out.push(
                        Alert::new(
                            now,
                            AlertType::Warning,
                            AlertMetric::WinRate,
                            &stats.trader_id,
                            win_rate,
                        )
                        .describe(format!(
                            "{} win rate fell from {:.1}% to {:.1}%",
                            name, baseline, win_rate
                        ))
                        .with_threshold(floor),
                    );
                }
            }
        }

        let loss_rule = &thresholds.cumulative_loss;
        if loss_rule.enabled && total_pnl < -loss_rule.value {
            out.push(
                Alert::new(
                    now,
                    AlertType::Danger,
                    AlertMetric::CumulativeLoss,
                    &stats.trader_id,
                    total_pnl,
                )
                .describe(format!("{} has lost ${:.2} in total", name, total_pnl.abs()))
                .with_threshold(-loss_rule.value),
            );
        }

        // Rides on the drop rule's switch.
        if drop_rule.enabled
            && win_rate < LOW_WIN_RATE_PCT
            && stats.trade_count >= LOW_WIN_RATE_MIN_TRADES
        {
            out.push(
                Alert::new(
                    now,
                    AlertType::Warning,
                    AlertMetric::LowWinRate,
                    &stats.trader_id,
                    win_rate,
                )
                .describe(format!("{} win rate is only {:.1}%", name, win_rate))
                .with_threshold(LOW_WIN_RATE_PCT),
            );
        }

        if total_pnl > HIGH_PERFORMER_PNL && win_rate > HIGH_PERFORMER_WIN_RATE_PCT {
            out.push(
                Alert::new(
                    now,
                    AlertType::Success,
                    AlertMetric::HighPerformer,
                    &stats.trader_id,
                    total_pnl,
                )
                .describe(format!(
                    "{} is up ${:.2} with a {:.1}% win rate",
                    name, total_pnl, win_rate
                )),
            );
        }
    }

    fn check_recent_trades(
        &self,
        thresholds: &AlertThresholds,
        subjects: &[AlertSubject],
        recent_trades: &[Trade],
        now: i64,
        out: &mut Vec<Alert>,
    ) {
        let rule = &thresholds.single_loss;
        if !rule.enabled {
            return;
        }

        let since = now - self.config.single_loss_window_secs;
        let names: HashMap<&str, &str> = subjects
            .iter()
            .map(|s| (s.stats.trader_id.as_str(), s.stats.display_name()))
            .collect();

        let mut qualifying: Vec<(&Trade, f64)> = recent_trades
            .iter()
            .filter(|t| t.timestamp > since)
            .filter_map(|t| Some((t, t.profit_loss?.to_f64()?)))
            .filter(|(_, pnl)| *pnl < -rule.value)
            .collect();
        qualifying.sort_by(|a, b| b.0.timestamp.cmp(&a.0.timestamp));
        qualifying.truncate(self.config.single_loss_scan_limit);

        for (trade, pnl) in qualifying {
            let name = names
                .get(trade.trader_id.as_str())
                .copied()
                .unwrap_or(trade.trader_id.as_str());
            let mut alert = Alert::new(
                now,
                AlertType::Danger,
                AlertMetric::SingleLoss,
                &trade.trader_id,
                pnl,
            )
            .describe(format!("{} lost ${:.2} on a single trade", name, pnl.abs()))
            .with_threshold(-rule.value);
            alert.trade_id = Some(trade.id.clone());
            out.push(alert);
        }
    }

    fn deduplicate(&self, history: &VecDeque<Alert>, candidates: Vec<Alert>) -> Vec<Alert> {
        let skip = history.len().saturating_sub(self.config.dedup_lookback);
        let window = self.config.dedup_window_secs;

        candidates
            .into_iter()
            .filter(|candidate| {
                let duplicate = history
                    .iter()
                    .skip(skip)
                    .any(|old| old.repeats(candidate, window));
                if duplicate {
                    debug!(
                        trader_id = %candidate.trader_id,
                        metric = ?candidate.metric,
                        "Suppressed duplicate alert"
                    );
                }
                !duplicate
            })
            .collect()
    }

    async fn notify(&self, alerts: &[Alert]) {
        let listeners: Vec<AlertListener> = self
            .listeners
            .read()
            .await
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(alerts))).is_err() {
                warn!(alerts = alerts.len(), "Alert listener panicked");
            }
        }
    }

    /// Register a listener for each batch of new alerts.
    pub async fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&[Alert]) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let listener: AlertListener = Arc::new(listener);
        self.listeners.write().await.push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Most recent unacknowledged alerts, oldest first.
    pub async fn active_alerts(&self) -> Vec<Alert> {
        let history = self.history.read().await;
        let active: Vec<&Alert> = history.iter().filter(|a| !a.acknowledged).collect();
        let skip = active.len().saturating_sub(self.config.active_limit);
        active.into_iter().skip(skip).cloned().collect()
    }

    /// The last `limit` alerts, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<Alert> {
        let history = self.history.read().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Mark an alert acknowledged. Unknown ids return `Ok(false)`.
    pub async fn acknowledge_alert(&self, id: &str) -> Result<bool> {
        let id = Uuid::parse_str(id.trim())
            .map_err(|_| Error::invalid_input(format!("malformed alert id {:?}", id)))?;

        let mut history = self.history.write().await;
        match history.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn clear_alerts(&self) {
        self.history.write().await.clear();
        info!("Alert history cleared");
    }

    pub async fn stats(&self) -> AlertStats {
        let total = self.history.read().await.len();
        let active = self.active_alerts().await;

        let mut by_type = AlertTypeCounts::default();
        for alert in &active {
            match alert.alert_type {
                AlertType::Danger => by_type.danger += 1,
                AlertType::Warning => by_type.warning += 1,
                AlertType::Success => by_type.success += 1,
            }
        }

        AlertStats {
            total,
            active: active.len(),
            by_type,
        }
    }

    pub async fn thresholds(&self) -> AlertThresholds {
        self.thresholds.read().await.clone()
    }

    /// Update one rule and write all thresholds through to the config store.
    ///
    /// Unknown rule names return `Ok(false)`. A store failure is reported as
    /// `ConfigUnavailable` but the in-memory change stays in effect.
    pub async fn set_threshold(&self, kind: &str, update: ThresholdUpdate) -> Result<bool> {
        let Some(kind) = ThresholdKind::parse(kind) else {
            return Ok(false);
        };
        update.validate()?;

        let snapshot = {
            let mut thresholds = self.thresholds.write().await;
            thresholds.apply(kind, &update);
            thresholds.clone()
        };
        info!(rule = %kind, ?update, "Alert threshold updated");

        if let Err(e) = snapshot.save(self.store.as_ref()).await {
            warn!(rule = %kind, error = %e, "Failed to persist alert thresholds");
            return Err(e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytrade_core::store::MemoryConfigStore;
    use copytrade_core::types::TradeSide;
    use std::sync::atomic::AtomicUsize;

    const NOW: i64 = 1_700_000_000;

    async fn engine() -> AlertEngine {
        AlertEngine::load(Arc::new(MemoryConfigStore::new()), AlertEngineConfig::default())
            .await
            .unwrap()
    }

    fn stats(id: &str, trades: u64, win_rate: f64, total_pnl: i64) -> TraderStats {
        let mut stats = TraderStats::empty(id);
        stats.trade_count = trades;
        stats.win_count = (trades as f64 * win_rate / 100.0) as u64;
        stats.loss_count = trades - stats.win_count;
        stats.win_rate_pct = win_rate;
        stats.total_profit_loss = Decimal::new(total_pnl, 0);
        stats
    }

    fn subject(stats: TraderStats) -> AlertSubject {
        AlertSubject::new(stats, None)
    }

    fn losing_trade(id: &str, trader: &str, pnl: i64, ts: i64) -> Trade {
        Trade::new(id, trader, TradeSide::Sell, Decimal::new(5000, 0), ts)
            .with_profit_loss(Decimal::new(pnl, 0))
    }

    #[tokio::test]
    async fn test_cumulative_loss_fires_once_per_window() {
        let engine = engine().await;
        let subjects = vec![subject(stats("0xloser", 5, 50.0, -6000))];

        let first = engine.evaluate(&subjects, &[], NOW).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].alert_type, AlertType::Danger);
        assert_eq!(first[0].metric, AlertMetric::CumulativeLoss);
        assert_eq!(first[0].threshold, Some(-5000.0));

        let second = engine.evaluate(&subjects, &[], NOW + 600).await;
        assert!(second.is_empty());

        // Outside the dedup window the condition alerts again.
        let later = engine.evaluate(&subjects, &[], NOW + 3600).await;
        assert_eq!(later.len(), 1);
        assert_eq!(engine.history(100).await.len(), 2);
    }

    #[tokio::test]
    async fn test_win_rate_drop_needs_baseline() {
        let engine = engine().await;
        let without = subject(stats("0xa", 12, 40.0, 0));
        let with = AlertSubject::new(stats("0xb", 12, 40.0, 0), Some(55.0));
        let too_few = AlertSubject::new(stats("0xc", 9, 40.0, 0), Some(55.0));

        let alerts = engine.evaluate(&[without, with, too_few], &[], NOW).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].trader_id, "0xb");
        assert_eq!(alerts[0].metric, AlertMetric::WinRate);
        assert_eq!(alerts[0].threshold, Some(45.0));
    }

    #[tokio::test]
    async fn test_low_win_rate_follows_drop_switch() {
        let engine = engine().await;
        let subjects = vec![subject(stats("0xa", 25, 20.0, 0))];

        let alerts = engine.evaluate(&subjects, &[], NOW).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, AlertMetric::LowWinRate);

        engine.clear_alerts().await;
        engine
            .set_threshold("winRateDrop", ThresholdUpdate::enabled(false))
            .await
            .unwrap();
        assert!(engine.evaluate(&subjects, &[], NOW).await.is_empty());
    }

    #[tokio::test]
    async fn test_high_performer_is_success() {
        let engine = engine().await;
        let alerts = engine
            .evaluate(&[subject(stats("0xwhale", 40, 70.0, 12_000))], &[], NOW)
            .await;

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Success);
        assert_eq!(alerts[0].metric, AlertMetric::HighPerformer);
        assert_eq!(alerts[0].threshold, None);
    }

    #[tokio::test]
    async fn test_single_loss_scans_recent_window() {
        let engine = engine().await;
        let mut named = stats("0xa", 3, 50.0, 0);
        named.label = Some("whale".to_string());

        let trades = vec![
            losing_trade("0xt1", "0xa", -1500, NOW - 100),
            losing_trade("0xt2", "0xa", -2500, NOW - 50),
            // Too small and too old.
            losing_trade("0xt3", "0xa", -900, NOW - 10),
            losing_trade("0xt4", "0xa", -5000, NOW - 4000),
        ];

        let alerts = engine.evaluate(&[subject(named)], &trades, NOW).await;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].trade_id.as_deref(), Some("0xt2"));
        assert_eq!(alerts[1].trade_id.as_deref(), Some("0xt1"));
        assert!(alerts[0].description.starts_with("whale"));

        let (since, max_loss) = engine.single_loss_window(NOW).await.unwrap();
        assert_eq!(since, NOW - 3600);
        assert_eq!(max_loss, Decimal::new(-1000, 0));
    }

    #[tokio::test]
    async fn test_acknowledge_and_active() {
        let engine = engine().await;
        let alerts = engine
            .evaluate(
                &[
                    subject(stats("0xa", 5, 50.0, -6000)),
                    subject(stats("0xb", 5, 50.0, -7000)),
                ],
                &[],
                NOW,
            )
            .await;
        assert_eq!(alerts.len(), 2);

        let id = alerts[0].id.to_string();
        assert!(engine.acknowledge_alert(&id).await.unwrap());
        assert!(!engine
            .acknowledge_alert(&Uuid::new_v4().to_string())
            .await
            .unwrap());
        assert!(matches!(
            engine.acknowledge_alert("alert_123").await,
            Err(Error::InvalidInput(_))
        ));

        let active = engine.active_alerts().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].trader_id, "0xb");

        let stats = engine.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.by_type.danger, 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = AlertEngineConfig {
            history_capacity: 3,
            ..AlertEngineConfig::default()
        };
        let engine = AlertEngine::load(Arc::new(MemoryConfigStore::new()), config)
            .await
            .unwrap();

        let subjects: Vec<AlertSubject> = (0..5)
            .map(|i| subject(stats(&format!("0x{}", i), 5, 50.0, -6000)))
            .collect();
        engine.evaluate(&subjects, &[], NOW).await;

        let history = engine.history(10).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].trader_id, "0x2");
        assert_eq!(history[2].trader_id, "0x4");
    }

    #[tokio::test]
    async fn test_listener_panic_does_not_block_others() {
        let engine = engine().await;
        let delivered = Arc::new(AtomicUsize::new(0));

        engine.subscribe(|_: &[Alert]| panic!("listener bug")).await;
        let counter = Arc::clone(&delivered);
        let id = engine
            .subscribe(move |alerts: &[Alert]| {
                counter.fetch_add(alerts.len(), Ordering::SeqCst);
            })
            .await;

        engine
            .evaluate(&[subject(stats("0xa", 5, 50.0, -6000))], &[], NOW)
            .await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);

        assert!(engine.unsubscribe(id).await);
        assert!(!engine.unsubscribe(id).await);
        engine
            .evaluate(&[subject(stats("0xb", 5, 50.0, -6000))], &[], NOW)
            .await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_threshold_persists() {
        let store: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new());
        let engine = AlertEngine::load(Arc::clone(&store), AlertEngineConfig::default())
            .await
            .unwrap();

        assert!(engine
            .set_threshold("cumulativeLoss", ThresholdUpdate::value(2000.0))
            .await
            .unwrap());
        assert!(!engine
            .set_threshold("drawdown", ThresholdUpdate::value(20.0))
            .await
            .unwrap());
        assert!(engine
            .set_threshold("singleLoss", ThresholdUpdate::default())
            .await
            .is_err());

        let reloaded = AlertEngine::load(store, AlertEngineConfig::default())
            .await
            .unwrap();
        assert_eq!(reloaded.thresholds().await.cumulative_loss.value, 2000.0);
    }

    #[tokio::test]
    async fn test_alert_serializes_with_wire_names() {
        let engine = engine().await;
        let alerts = engine
            .evaluate(&[subject(stats("0xa", 5, 50.0, -6000))], &[], NOW)
            .await;
        let json = serde_json::to_value(&alerts[0]).unwrap();

        assert_eq!(json["type"], "danger");
        assert_eq!(json["metric"], "cumulativeLoss");
        assert_eq!(json["traderId"], "0xa");
        assert!(json.get("tradeId").is_none());
    }
}
