//! Daily advisor report.

use chrono::NaiveDate;
use copytrade_core::types::{RecommendationKind, RecommendationRecord, TraderStats};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::advisor::{PortfolioSummary, TraderFlag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performer {
    pub trader_id: String,
    pub label: Option<String>,
    pub total_profit_loss: Decimal,
    pub trade_count: u64,
}

impl From<&TraderStats> for Performer {
    fn from(stats: &TraderStats) -> Self {
        Self {
            trader_id: stats.trader_id.clone(),
            label: stats.label.clone(),
            total_profit_loss: stats.total_profit_loss,
            trade_count: stats.trade_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_tracked: usize,
    /// Removal plus increase candidates.
    pub total_recommendations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecommendations {
    pub remove: Vec<TraderFlag>,
    pub increase: Vec<TraderFlag>,
    pub portfolio: PortfolioSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub summary: ReportSummary,
    pub top_performer: Option<Performer>,
    pub worst_performer: Option<Performer>,
    pub recommendations: ReportRecommendations,
}

impl DailyReport {
    /// Records to persist for this report: one per flagged trader and one
    /// for the portfolio summary. Ids are left for the store to assign.
    pub fn to_records(&self, created_at: i64) -> Vec<RecommendationRecord> {
        let flagged = |kind: RecommendationKind, flag: &TraderFlag| RecommendationRecord {
            id: 0,
            kind,
            trader_id: Some(flag.trader_id.clone()),
            reason: flag.reasons.join("; "),
            confidence: None,
            created_at,
        };

        let mut records: Vec<RecommendationRecord> = self
            .recommendations
            .remove
            .iter()
            .map(|f| flagged(RecommendationKind::Remove, f))
            .chain(
                self.recommendations
                    .increase
                    .iter()
                    .map(|f| flagged(RecommendationKind::Increase, f)),
            )
            .collect();

        records.push(RecommendationRecord {
            id: 0,
            kind: RecommendationKind::Portfolio,
            trader_id: None,
            reason: self.recommendations.portfolio.recommendation.clone(),
            confidence: None,
            created_at,
        });
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::PortfolioAdvisor;

    fn stats(id: &str, trades: u64, wins: u64, pnl: i64) -> TraderStats {
        let mut s = TraderStats::empty(id);
        s.trade_count = trades;
        s.win_count = wins;
        s.total_profit_loss = Decimal::new(pnl, 0);
        s
    }

    fn report() -> DailyReport {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        PortfolioAdvisor::default().generate_daily_report(
            &[
                stats("0xtop", 10, 9, 900),
                stats("0xworst", 10, 2, -400),
            ],
            date,
        )
    }

    #[test]
    fn test_to_records() {
        let records = report().to_records(1_710_000_000);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, RecommendationKind::Remove);
        assert_eq!(records[0].trader_id.as_deref(), Some("0xworst"));
        assert!(records[0].reason.contains("; "));
        assert_eq!(records[1].kind, RecommendationKind::Increase);
        assert_eq!(records[2].kind, RecommendationKind::Portfolio);
        assert!(records[2].trader_id.is_none());
        assert!(records.iter().all(|r| r.created_at == 1_710_000_000));
    }

    #[test]
    fn test_report_serializes_date() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["date"], "2024-03-09");
        assert_eq!(json["summary"]["totalTracked"], 2);
        assert_eq!(json["topPerformer"]["traderId"], "0xtop");
    }
}
