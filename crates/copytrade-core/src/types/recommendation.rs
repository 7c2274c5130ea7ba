//! Persisted advisor recommendations.

use serde::{Deserialize, Serialize};

/// Category of a stored recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Stop copying the trader.
    Remove,
    /// Raise the allocation to the trader.
    Increase,
    /// Portfolio-wide observation.
    Portfolio,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Remove => "remove",
            RecommendationKind::Increase => "increase",
            RecommendationKind::Portfolio => "portfolio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remove" => Some(RecommendationKind::Remove),
            "increase" => Some(RecommendationKind::Increase),
            "portfolio" => Some(RecommendationKind::Portfolio),
            _ => None,
        }
    }
}

/// A recommendation as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRecord {
    /// Assigned by the store; zero before insertion.
    pub id: i64,
    pub kind: RecommendationKind,
    pub trader_id: Option<String>,
    pub reason: String,
    pub confidence: Option<f64>,
    /// Unix seconds.
    pub created_at: i64,
}
