//! # Job Store
//!
//! Record store contract behind [`Job`](crate::models::Job): create, read,
//! and a partial update of the mutable fields.

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::InMemoryJobStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresJobStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::geo::SubAreaResult;
use crate::models::JobRecord;

/// The fields a save writes, applied atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobChanges {
    pub results: Vec<SubAreaResult>,
    pub finished: bool,
    pub run_times: HashMap<String, f64>,
}

#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Insert a new record. Fails with `Create` if the store rejects it.
    async fn create(&self, record: &JobRecord) -> Result<()>;

    /// Fails with `Read` if the job does not exist.
    async fn read(&self, job_id: Uuid) -> Result<JobRecord>;

    /// Overwrite the mutable fields. Fails with `Update` if the job does not
    /// exist or the write is rejected.
    async fn update(&self, job_id: Uuid, changes: &JobChanges) -> Result<()>;

    fn store_name(&self) -> &'static str;
}
