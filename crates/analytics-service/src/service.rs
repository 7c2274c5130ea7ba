//! Facade over the analytics components.

use anyhow::{Context, Result};
use backtester::{BacktestOutcome, BacktestSimulator};
use chrono::{DateTime, Utc};
use copytrade_core::db::{self, PgConfigStore, PgRecommendationStore, PgTradeRepository};
use copytrade_core::error::validate_trader_id;
use copytrade_core::repository::TradeRepository;
use copytrade_core::store::{ConfigStore, RecommendationFilter, RecommendationStore};
use copytrade_core::types::{RecommendationRecord, Trade, TraderStats};
use portfolio_advisor::{DailyReport, PortfolioAdvisor};
use risk_manager::{Alert, AlertEngine, AlertSubject};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use wallet_tracker::metrics::historical_win_rate;
use wallet_tracker::{Score, ScoredTrader, ScoringEngine};

use crate::config::ServiceConfig;

/// Entry point for hosts: CLI, API handlers or a scheduler.
pub struct AnalyticsService {
    trades: Arc<dyn TradeRepository>,
    scoring: ScoringEngine,
    simulator: BacktestSimulator,
    alerts: AlertEngine,
    advisor: PortfolioAdvisor,
    recommendations: Option<Arc<dyn RecommendationStore>>,
}

impl AnalyticsService {
    /// Build the service over caller-supplied collaborators.
    pub async fn new(
        config: &ServiceConfig,
        trades: Arc<dyn TradeRepository>,
        config_store: Arc<dyn ConfigStore>,
    ) -> Result<Self> {
        let scoring =
            ScoringEngine::with_weights(config.scoring).context("Invalid scoring weights")?;
        let simulator = BacktestSimulator::new(config.simulator.clone())
            .context("Invalid simulator configuration")?;
        let alerts = AlertEngine::load(config_store, config.alerts.clone())
            .await
            .context("Invalid alert engine configuration")?;
        let advisor = PortfolioAdvisor::new(config.advisor.clone())
            .context("Invalid advisor configuration")?;

        Ok(Self {
            trades,
            scoring,
            simulator,
            alerts,
            advisor,
            recommendations: None,
        })
    }

    /// Persist daily report recommendations to `store`.
    pub fn with_recommendation_store(mut self, store: Arc<dyn RecommendationStore>) -> Self {
        self.recommendations = Some(store);
        self
    }

    /// Build the service over PostgreSQL, running migrations first.
    pub async fn connect(config: &ServiceConfig) -> Result<Self> {
        let db_config = config
            .database
            .as_ref()
            .context("DATABASE_URL or a [database] section is required")?;

        let pool = db::create_pool(db_config)
            .await
            .context("Failed to connect to database")?;
        db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
        info!("Connected to database");

        let service = Self::new(
            config,
            Arc::new(PgTradeRepository::new(pool.clone())),
            Arc::new(PgConfigStore::new(pool.clone())),
        )
        .await?;

        Ok(service.with_recommendation_store(Arc::new(PgRecommendationStore::new(pool))))
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub async fn compute_trader_stats(&self, trader_id: &str) -> Result<TraderStats> {
        validate_trader_id(trader_id)?;
        let trades = self.load_trades(trader_id).await?;
        Ok(TraderStats::from_trades(trader_id, &trades))
    }

    pub fn calculate_score(&self, stats: &TraderStats, trades: &[Trade]) -> Score {
        self.scoring.calculate_score(stats, trades)
    }

    /// Load one trader's ledger and score it.
    pub async fn score_trader(&self, trader_id: &str) -> Result<ScoredTrader> {
        validate_trader_id(trader_id)?;
        let trades = self.load_trades(trader_id).await?;
        let stats = TraderStats::from_trades(trader_id, &trades);
        let score = self.scoring.calculate_score(&stats, &trades);

        debug!(trader_id, overall = score.overall, "Scored trader");
        Ok(ScoredTrader { stats, score })
    }

    /// Score each trader against its ledger, preserving input order.
    pub async fn batch_score_traders(&self, stats: Vec<TraderStats>) -> Result<Vec<ScoredTrader>> {
        let mut batch = Vec::with_capacity(stats.len());
        for s in stats {
            let trades = self.load_trades(&s.trader_id).await?;
            batch.push((s, trades));
        }
        Ok(self.scoring.batch_score(batch))
    }

    /// Highest-scoring tracked traders with score >= 60 that are not high risk.
    pub async fn top_recommendations(&self, limit: usize) -> Result<Vec<ScoredTrader>> {
        let stats = self.all_stats().await?;
        let scored = self.batch_score_traders(stats).await?;
        Ok(ScoringEngine::top_recommendations(scored, limit))
    }

    /// Replay `trades`, optionally overriding the configured starting capital.
    pub fn run_backtest(
        &self,
        trades: &[Trade],
        initial_capital: Option<Decimal>,
    ) -> Result<BacktestOutcome> {
        match initial_capital {
            None => Ok(self.simulator.run(trades)),
            Some(capital) => {
                let config = self.simulator.config().clone().with_initial_capital(capital);
                let simulator = BacktestSimulator::new(config)?;
                Ok(simulator.run(trades))
            }
        }
    }

    pub async fn backtest_trader(
        &self,
        trader_id: &str,
        initial_capital: Option<Decimal>,
    ) -> Result<BacktestOutcome> {
        validate_trader_id(trader_id)?;
        let trades = self.load_trades(trader_id).await?;
        self.run_backtest(&trades, initial_capital)
    }

    /// Run the alert rules against the repository as of now.
    pub async fn evaluate_alerts(&self) -> Result<Vec<Alert>> {
        self.evaluate_alerts_at(Utc::now().timestamp()).await
    }

    /// Run the alert rules against the repository as of `now` (unix seconds).
    pub async fn evaluate_alerts_at(&self, now: i64) -> Result<Vec<Alert>> {
        let stats = self.all_stats().await?;
        let cutoff = now - self.alerts.config().baseline_age_secs;

        let mut subjects = Vec::with_capacity(stats.len());
        for s in stats {
            let trades = self.load_trades(&s.trader_id).await?;
            let baseline = historical_win_rate(&trades, cutoff);
            subjects.push(AlertSubject::new(s, baseline));
        }

        let recent = match self.alerts.single_loss_window(now).await {
            Some((since, max_loss)) => self
                .trades
                .list_recent_trades(since, max_loss)
                .await
                .context("Failed to load recent trades")?,
            None => Vec::new(),
        };

        Ok(self.alerts.evaluate(&subjects, &recent, now).await)
    }

    /// Build today's report and persist its recommendations when a store is set.
    pub async fn generate_daily_report(&self) -> Result<DailyReport> {
        self.generate_daily_report_at(Utc::now()).await
    }

    pub async fn generate_daily_report_at(&self, now: DateTime<Utc>) -> Result<DailyReport> {
        let stats = self.all_stats().await?;
        let report = self.advisor.generate_daily_report(&stats, now.date_naive());

        if let Some(store) = &self.recommendations {
            for record in report.to_records(now.timestamp()) {
                store
                    .save(&record)
                    .await
                    .context("Failed to save recommendation")?;
            }
        }

        Ok(report)
    }

    /// Stored recommendations, newest first. Empty without a store.
    pub async fn latest_recommendations(
        &self,
        filter: RecommendationFilter,
    ) -> Result<Vec<RecommendationRecord>> {
        match &self.recommendations {
            Some(store) => Ok(store
                .latest(&filter)
                .await
                .context("Failed to load recommendations")?),
            None => Ok(Vec::new()),
        }
    }

    async fn load_trades(&self, trader_id: &str) -> Result<Vec<Trade>> {
        self.trades
            .list_trades(trader_id)
            .await
            .with_context(|| format!("Failed to load trades for {}", trader_id))
    }

    async fn all_stats(&self) -> Result<Vec<TraderStats>> {
        self.trades
            .list_all_trader_stats()
            .await
            .context("Failed to load trader stats")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copytrade_core::store::{MemoryConfigStore, MemoryRecommendationStore};
    use copytrade_core::types::{RecommendationKind, TradeSide};
    use copytrade_core::{Error, MemoryTradeRepository};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Ledger {}

        #[async_trait]
        impl TradeRepository for Ledger {
            async fn list_trades(&self, trader_id: &str) -> copytrade_core::Result<Vec<Trade>>;
            async fn list_all_trader_stats(&self) -> copytrade_core::Result<Vec<TraderStats>>;
            async fn list_recent_trades(
                &self,
                since: i64,
                max_loss_threshold: Decimal,
            ) -> copytrade_core::Result<Vec<Trade>>;
        }
    }

    const NOW: i64 = 1_700_000_000;

    fn trade(id: &str, trader: &str, pnl: i64, ts: i64) -> Trade {
        Trade::new(id, trader, TradeSide::Buy, Decimal::new(100, 0), ts)
            .with_profit_loss(Decimal::new(pnl, 0))
    }

    async fn service(repo: Arc<dyn TradeRepository>) -> AnalyticsService {
        AnalyticsService::new(
            &ServiceConfig::default(),
            repo,
            Arc::new(MemoryConfigStore::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_repository_errors_propagate() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_list_trades()
            .with(eq("0xabc"))
            .returning(|_| Err(Error::NotFound("ledger offline".to_string())));
        let service = service(Arc::new(ledger)).await;

        let err = service.score_trader("0xabc").await.unwrap_err();
        assert!(err.to_string().contains("0xabc"));
        assert!(err.downcast_ref::<Error>().is_some());
    }

    #[tokio::test]
    async fn test_malformed_trader_id_rejected() {
        let service = service(Arc::new(MockLedger::new())).await;
        let err = service.compute_trader_stats(" 0xabc").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_single_loss_window_queried_from_repository() {
        let mut ledger = MockLedger::new();
        ledger.expect_list_all_trader_stats().returning(|| Ok(vec![]));
        ledger
            .expect_list_recent_trades()
            .with(eq(NOW - 3600), eq(Decimal::new(-1000, 0)))
            .times(1)
            .returning(|_, _| Ok(vec![trade("0xt1", "0xabc", -1500, NOW - 60)]));
        let service = service(Arc::new(ledger)).await;

        let alerts = service.evaluate_alerts_at(NOW).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].trade_id.as_deref(), Some("0xt1"));
    }

    #[tokio::test]
    async fn test_disabled_single_loss_skips_query() {
        let mut ledger = MockLedger::new();
        ledger.expect_list_all_trader_stats().returning(|| Ok(vec![]));
        ledger.expect_list_recent_trades().never();
        let service = service(Arc::new(ledger)).await;

        service
            .alerts()
            .set_threshold("singleLoss", risk_manager::ThresholdUpdate::enabled(false))
            .await
            .unwrap();
        assert!(service.evaluate_alerts_at(NOW).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_win_rate_drop_uses_old_trades_as_baseline() {
        let repo = Arc::new(MemoryTradeRepository::new());
        let week_ago = NOW - 8 * 86_400;
        // 10 old wins, then 12 recent trades with 3 wins.
        for i in 0..10 {
            repo.insert_trade(trade(&format!("0xold{}", i), "0xabc", 10, week_ago + i))
                .unwrap();
        }
        for i in 0..12 {
            let pnl = if i < 3 { 10 } else { -10 };
            repo.insert_trade(trade(&format!("0xnew{}", i), "0xabc", pnl, NOW - 1000 + i))
                .unwrap();
        }
        let service = service(repo).await;

        let alerts = service.evaluate_alerts_at(NOW).await.unwrap();
        let drop: Vec<&Alert> = alerts
            .iter()
            .filter(|a| a.metric == risk_manager::AlertMetric::WinRate)
            .collect();
        assert_eq!(drop.len(), 1);
        assert_eq!(drop[0].threshold, Some(90.0));
    }

    #[tokio::test]
    async fn test_backtest_capital_override() {
        let service = service(Arc::new(MockLedger::new())).await;
        let trades = vec![trade("0xt1", "0xabc", 50, 1)];

        let outcome = service
            .run_backtest(&trades, Some(Decimal::new(2000, 0)))
            .unwrap();
        assert_eq!(outcome.final_capital(), Some(Decimal::new(2100, 0)));

        assert!(service
            .run_backtest(&trades, Some(Decimal::new(-5, 0)))
            .is_err());
        assert_eq!(
            service.run_backtest(&[], None).unwrap(),
            BacktestOutcome::NoTradeHistory
        );
    }

    #[tokio::test]
    async fn test_daily_report_is_persisted() {
        let repo = Arc::new(MemoryTradeRepository::new());
        repo.insert_trade(trade("0xt1", "0xgood", 500, 10)).unwrap();
        repo.insert_trade(trade("0xt2", "0xbad", -300, 20)).unwrap();

        let store = Arc::new(MemoryRecommendationStore::new());
        let service = service(repo)
            .await
            .with_recommendation_store(store.clone());

        let now = DateTime::from_timestamp(NOW, 0).unwrap();
        let report = service.generate_daily_report_at(now).await.unwrap();
        assert_eq!(report.summary.total_recommendations, 2);

        let removals = service
            .latest_recommendations(RecommendationFilter::new().kind(RecommendationKind::Remove))
            .await
            .unwrap();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].trader_id.as_deref(), Some("0xbad"));
        assert_eq!(removals[0].created_at, NOW);

        let all = store.latest(&RecommendationFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
