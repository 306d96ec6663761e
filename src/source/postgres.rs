//! Tweet counts from a `geotally_tweets (id, lat, lon, created_at)` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::TweetSource;
use crate::error::{GeotallyError, Result};
use crate::geo::CoordinateBox;

#[derive(Debug, Clone)]
pub struct PostgresTweetSource {
    pool: PgPool,
}

impl PostgresTweetSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TweetSource for PostgresTweetSource {
    #[instrument(skip(self), fields(coordinate_box = %coordinate_box))]
    async fn count_in_box(
        &self,
        coordinate_box: &CoordinateBox,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM geotally_tweets
            WHERE lat BETWEEN $1 AND $2
              AND lon BETWEEN $3 AND $4
              AND ($5::timestamptz IS NULL OR created_at >= $5)
            "#,
        )
        .bind(coordinate_box.min_lat)
        .bind(coordinate_box.max_lat)
        .bind(coordinate_box.min_lon)
        .bind(coordinate_box.max_lon)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GeotallyError::DataSource(format!("tweet count failed: {e}")))?;

        Ok(count.max(0) as u64)
    }

    fn source_name(&self) -> &'static str {
        "postgres"
    }
}
