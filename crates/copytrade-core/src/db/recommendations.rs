//! Recommendation log backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{Error, Result};
use crate::store::{RecommendationFilter, RecommendationStore};
use crate::types::{RecommendationKind, RecommendationRecord};

/// Recommendation log over the `recommendations` table.
pub struct PgRecommendationStore {
    pool: PgPool,
}

impl PgRecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn save(&self, record: &RecommendationRecord) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO recommendations (kind, trader_id, reason, confidence, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(record.kind.as_str())
        .bind(&record.trader_id)
        .bind(&record.reason)
        .bind(record.confidence)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn latest(&self, filter: &RecommendationFilter) -> Result<Vec<RecommendationRecord>> {
        let kind = filter.kind.map(|k| k.as_str());
        let limit = filter.limit.unwrap_or(RecommendationFilter::DEFAULT_LIMIT) as i64;

        let rows = sqlx::query(
            r#"
            SELECT id, kind, trader_id, reason, confidence, created_at
            FROM recommendations
            WHERE ($1::TEXT IS NULL OR kind = $1)
              AND ($2::TEXT IS NULL OR trader_id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(kind)
        .bind(&filter.trader_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<RecommendationRecord> {
                let kind_raw: String = row.try_get("kind")?;
                let kind = RecommendationKind::parse(&kind_raw).ok_or_else(|| {
                    Error::invalid_input(format!("unknown recommendation kind {:?}", kind_raw))
                })?;

                Ok(RecommendationRecord {
                    id: row.try_get("id")?,
                    kind,
                    trader_id: row.try_get("trader_id")?,
                    reason: row.try_get("reason")?,
                    confidence: row.try_get("confidence")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
