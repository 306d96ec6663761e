//! # Orchestrator
//!
//! Scatter side of a request: decompose the region, create the job, enqueue
//! one task per sub-area.
//!
//! The job is saved before any task is posted. If the process dies part way
//! through posting, the job keeps its full `expected_sub_areas` and can never
//! finish; there is no recovery for a partial enqueue.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::constants::{run_times, tasks::COUNT_TWEETS};
use crate::error::Result;
use crate::logging::log_job_operation;
use crate::messaging::{TaskMessage, TaskQueue};
use crate::models::Job;
use crate::regions::RegionStrategy;
use crate::store::JobStore;

pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    task_queue: Arc<TaskQueue>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store.store_name())
            .field("task_queue", &self.task_queue)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(store: Arc<dyn JobStore>, task_queue: Arc<TaskQueue>) -> Self {
        Self { store, task_queue }
    }

    /// Start a `count_tweets` job over `region` and return its id
    pub async fn request_count_in_region(&self, region: &dyn RegionStrategy) -> Result<Uuid> {
        self.request_count_in_region_with_id(Uuid::new_v4(), region)
            .await
    }

    /// Same as [`Self::request_count_in_region`] with the job id chosen by
    /// the caller, as the request intake path does.
    #[instrument(skip(self, region), fields(region = region.variant()))]
    pub async fn request_count_in_region_with_id(
        &self,
        job_id: Uuid,
        region: &dyn RegionStrategy,
    ) -> Result<Uuid> {
        let started = Instant::now();
        let boxes = region.decompose();
        let record = region.to_record()?;

        let mut job =
            Job::create_with_id(self.store.as_ref(), job_id, COUNT_TWEETS, record, boxes.len())
                .await?;
        job.add_run_time(run_times::DECOMPOSE, started.elapsed().as_secs_f64());
        job.save(self.store.as_ref()).await?;
        log_job_operation("created", &job_id, 0, boxes.len(), Some(region.variant()));

        for coordinate_box in boxes {
            self.task_queue
                .post(&TaskMessage::new(job_id, COUNT_TWEETS, coordinate_box))
                .await?;
        }

        info!(
            job_id = %job_id,
            tasks = job.expected_sub_areas(),
            queue = self.task_queue.queue_name(),
            "Enqueued sub-area tasks"
        );
        Ok(job_id)
    }
}
