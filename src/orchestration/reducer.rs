use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::error::Result;
use crate::logging::{log_job_operation, log_queue_operation};
use crate::messaging::{ResultMessage, ResultQueue};
use crate::models::Job;
use crate::processing::{ItemProcessor, PollOutcome};
use crate::store::JobStore;

/// Gather side: folds sub-area results into their jobs.
///
/// Each result is a read-modify-write of the job with no version check, so
/// reducers handling the same job at the same time can lose an update.
pub struct Reducer {
    result_queue: Arc<ResultQueue>,
    store: Arc<dyn JobStore>,
}

impl Reducer {
    pub fn new(result_queue: Arc<ResultQueue>, store: Arc<dyn JobStore>) -> Self {
        Self {
            result_queue,
            store,
        }
    }

    #[instrument(skip(self, result), fields(job_id = %result.job_id, task = %result.task))]
    async fn reduce(&self, result: &ResultMessage) -> Result<()> {
        let mut job = Job::find_by_id(self.store.as_ref(), result.job_id).await?;
        let was_finished = job.is_finished();

        job.add_result(result.coordinate_box, result.value);
        if let Some(secs) = result.run_time_secs {
            job.add_run_time(&result.task, secs);
        }
        job.save(self.store.as_ref()).await?;
        self.result_queue.finish(result).await?;

        if job.is_finished() && !was_finished {
            log_job_operation(
                "finished",
                &job.id(),
                job.results().len(),
                job.expected_sub_areas(),
                None,
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reducer")
            .field("result_queue", &self.result_queue)
            .field("store", &self.store.store_name())
            .finish()
    }
}

#[async_trait]
impl ItemProcessor for Reducer {
    fn name(&self) -> &'static str {
        "reducer"
    }

    async fn process_next(&self) -> Result<PollOutcome> {
        let Some(result) = self.result_queue.poll().await? else {
            return Ok(PollOutcome::Empty);
        };
        log_queue_operation(
            "received",
            self.result_queue.queue_name(),
            &result.job_id,
            &result.task,
        );

        match self.reduce(&result).await {
            Ok(()) => Ok(PollOutcome::Processed),
            Err(e) => {
                self.result_queue.release(&result);
                Err(e)
            }
        }
    }
}
