//! Postgres job store.
//!
//! ```sql
//! CREATE TABLE geotally_jobs (
//!   id UUID PRIMARY KEY,
//!   task TEXT NOT NULL,
//!   region_strategy JSONB NOT NULL,
//!   expected_sub_areas INTEGER NOT NULL,
//!   results JSONB NOT NULL DEFAULT '[]',
//!   finished BOOLEAN NOT NULL DEFAULT false,
//!   run_times JSONB NOT NULL DEFAULT '{}',
//!   created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!   updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{JobChanges, JobStore};
use crate::error::{GeotallyError, Result};
use crate::geo::SubAreaResult;
use crate::models::JobRecord;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS geotally_jobs (
  id UUID PRIMARY KEY,
  task TEXT NOT NULL,
  region_strategy JSONB NOT NULL,
  expected_sub_areas INTEGER NOT NULL,
  results JSONB NOT NULL DEFAULT '[]',
  finished BOOLEAN NOT NULL DEFAULT false,
  run_times JSONB NOT NULL DEFAULT '{}',
  created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
  updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    task: String,
    region_strategy: Value,
    expected_sub_areas: i32,
    results: Json<Vec<SubAreaResult>>,
    finished: bool,
    run_times: Json<HashMap<String, f64>>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id,
            task: row.task,
            region_strategy: row.region_strategy,
            expected_sub_areas: row.expected_sub_areas.max(0) as usize,
            results: row.results.0,
            finished: row.finished,
            run_times: row.run_times.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the jobs table if it is missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| GeotallyError::Configuration(format!("job table migration failed: {e}")))?;
        info!("Job table ready");
        Ok(())
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    #[instrument(skip(self, record), fields(job_id = %record.id))]
    async fn create(&self, record: &JobRecord) -> Result<()> {
        let expected = i32::try_from(record.expected_sub_areas).map_err(|_| {
            GeotallyError::Create(format!(
                "job {} expects too many sub-areas: {}",
                record.id, record.expected_sub_areas
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO geotally_jobs
              (id, task, region_strategy, expected_sub_areas, results, finished, run_times)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.task)
        .bind(&record.region_strategy)
        .bind(expected)
        .bind(Json(&record.results))
        .bind(record.finished)
        .bind(Json(&record.run_times))
        .execute(&self.pool)
        .await
        .map_err(|e| GeotallyError::Create(format!("job {}: {e}", record.id)))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, job_id: Uuid) -> Result<JobRecord> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT id, task, region_strategy, expected_sub_areas, results, finished, run_times
            FROM geotally_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GeotallyError::Read(format!("job {job_id}: {e}")))?;

        row.map(JobRecord::from)
            .ok_or_else(|| GeotallyError::Read(format!("job {job_id} does not exist")))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, job_id: Uuid, changes: &JobChanges) -> Result<()> {
        let outcome = sqlx::query(
            r#"
            UPDATE geotally_jobs
            SET results = $2, finished = $3, run_times = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(Json(&changes.results))
        .bind(changes.finished)
        .bind(Json(&changes.run_times))
        .execute(&self.pool)
        .await
        .map_err(|e| GeotallyError::Update(format!("job {job_id}: {e}")))?;

        if outcome.rows_affected() == 0 {
            return Err(GeotallyError::Update(format!("job {job_id} does not exist")));
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "postgres"
    }
}
