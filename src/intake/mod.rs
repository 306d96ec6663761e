//! # Request Intake
//!
//! Asynchronous front door. [`AnalyticsApi`] puts whole-region requests on
//! the request queue and hands back a [`ResultHandle`] straight away;
//! [`RequestProcessor`] later turns each request into a job and its tasks.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::constants::tasks::COUNT_TWEETS;
use crate::error::{GeotallyError, Result};
use crate::logging::log_queue_operation;
use crate::messaging::{RequestMessage, RequestQueue};
use crate::models::Job;
use crate::orchestration::{Orchestrator, ResultHandle, DEFAULT_POLL_INTERVAL};
use crate::processing::{ItemProcessor, PollOutcome};
use crate::regions::{RegionRegistry, RegionStrategy};
use crate::store::JobStore;
use crate::styles::StyleStrategy;

pub struct AnalyticsApi {
    request_queue: Arc<RequestQueue>,
    store: Arc<dyn JobStore>,
    result_poll_interval: Duration,
}

impl AnalyticsApi {
    pub fn new(request_queue: Arc<RequestQueue>, store: Arc<dyn JobStore>) -> Self {
        Self {
            request_queue,
            store,
            result_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Poll interval given to the handles this API returns
    pub fn with_result_poll_interval(mut self, interval: Duration) -> Self {
        self.result_poll_interval = interval;
        self
    }

    /// Request a tweet count over `region`, styled with `style` on retrieval.
    ///
    /// The job does not exist until a [`RequestProcessor`] picks the request
    /// up; until then the returned handle reports not ready.
    #[instrument(skip_all, fields(region = region.variant()))]
    pub async fn count_tweets(
        &self,
        region: &dyn RegionStrategy,
        style: Box<dyn StyleStrategy>,
    ) -> Result<ResultHandle> {
        let request = RequestMessage {
            job_id: Uuid::new_v4(),
            task: COUNT_TWEETS.to_string(),
            region_strategy: region.to_record()?,
        };
        self.request_queue.post(&request).await?;
        info!(job_id = %request.job_id, "Accepted count request");

        Ok(
            ResultHandle::for_pending_job(request.job_id, self.store.clone(), style)
                .with_poll_interval(self.result_poll_interval),
        )
    }
}

impl std::fmt::Debug for AnalyticsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsApi")
            .field("request_queue", &self.request_queue)
            .field("store", &self.store.store_name())
            .finish()
    }
}

/// Turns queued requests into jobs.
///
/// A request whose job already exists was handled before (its finish was
/// lost or it was redelivered) and is acknowledged without enqueuing again.
pub struct RequestProcessor {
    request_queue: Arc<RequestQueue>,
    store: Arc<dyn JobStore>,
    orchestrator: Arc<Orchestrator>,
    regions: RegionRegistry,
}

impl RequestProcessor {
    pub fn new(
        request_queue: Arc<RequestQueue>,
        store: Arc<dyn JobStore>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            request_queue,
            store,
            orchestrator,
            regions: RegionRegistry::regions(),
        }
    }

    pub fn with_regions(mut self, regions: RegionRegistry) -> Self {
        self.regions = regions;
        self
    }

    #[instrument(skip(self, request), fields(job_id = %request.job_id, task = %request.task))]
    async fn accept(&self, request: &RequestMessage) -> Result<()> {
        if request.task != COUNT_TWEETS {
            return Err(GeotallyError::unknown_task(&request.task));
        }

        match Job::find_by_id(self.store.as_ref(), request.job_id).await {
            Ok(job) if job.is_finished() => {
                info!("Job already finished, acknowledging duplicate request");
            }
            Ok(job) => {
                // Also reached when an earlier attempt saved the job and then
                // failed posting tasks; such a job never finishes
                warn!(
                    expected_sub_areas = job.expected_sub_areas(),
                    received = job.results().len(),
                    "Job already exists and is unfinished, acknowledging duplicate request; \
                     it stalls if its earlier tasks were not all posted"
                );
            }
            Err(GeotallyError::Read(_)) => {
                let region = self.regions.from_record(&request.region_strategy)?;
                self.orchestrator
                    .request_count_in_region_with_id(request.job_id, region.as_ref())
                    .await?;
            }
            Err(e) => return Err(e),
        }

        self.request_queue.finish(request).await
    }
}

impl std::fmt::Debug for RequestProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestProcessor")
            .field("request_queue", &self.request_queue)
            .field("orchestrator", &self.orchestrator)
            .field("regions", &self.regions.variants())
            .finish()
    }
}

#[async_trait]
impl ItemProcessor for RequestProcessor {
    fn name(&self) -> &'static str {
        "request_processor"
    }

    async fn process_next(&self) -> Result<PollOutcome> {
        let Some(request) = self.request_queue.poll().await? else {
            return Ok(PollOutcome::Empty);
        };
        log_queue_operation(
            "received",
            self.request_queue.queue_name(),
            &request.job_id,
            &request.task,
        );

        match self.accept(&request).await {
            Ok(()) => Ok(PollOutcome::Processed),
            Err(e) => {
                self.request_queue.release(&request);
                Err(e)
            }
        }
    }
}
