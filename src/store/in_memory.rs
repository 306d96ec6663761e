use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{JobChanges, JobStore};
use crate::error::{GeotallyError, Result};
use crate::models::JobRecord;

/// Process-local job store for tests and single-node runs
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, JobRecord>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, record: &JobRecord) -> Result<()> {
        match self.jobs.entry(record.id) {
            Entry::Occupied(_) => Err(GeotallyError::Create(format!(
                "job {} already exists",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn read(&self, job_id: Uuid) -> Result<JobRecord> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GeotallyError::Read(format!("job {job_id} does not exist")))
    }

    async fn update(&self, job_id: Uuid, changes: &JobChanges) -> Result<()> {
        let mut entry = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| GeotallyError::Update(format!("job {job_id} does not exist")))?;
        let record = entry.value_mut();
        record.results = changes.results.clone();
        record.finished = changes.finished;
        record.run_times = changes.run_times.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "in_memory"
    }
}
