//! # Result Handle
//!
//! Caller-side view of one job's outcome.
//!
//! A handle only reads the job; it never changes it. Blocking retrieval is
//! plain fixed-interval polling against the store with a deadline.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GeotallyError, Result};
use crate::models::Job;
use crate::regions::RegionRegistry;
use crate::store::JobStore;
use crate::styles::StyleStrategy;

/// Default interval between job reads in [`ResultHandle::get_blocking`]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct ResultHandle {
    job_id: Uuid,
    store: Arc<dyn JobStore>,
    regions: RegionRegistry,
    style: Box<dyn StyleStrategy>,
    poll_interval: Duration,
    /// A missing job reads as not ready instead of failing
    allow_missing: bool,
}

impl ResultHandle {
    pub fn new(job_id: Uuid, store: Arc<dyn JobStore>, style: Box<dyn StyleStrategy>) -> Self {
        Self {
            job_id,
            store,
            regions: RegionRegistry::regions(),
            style,
            poll_interval: DEFAULT_POLL_INTERVAL,
            allow_missing: false,
        }
    }

    /// Handle for a job that may not have been created yet, as when the
    /// request still sits on the request queue.
    pub fn for_pending_job(
        job_id: Uuid,
        store: Arc<dyn JobStore>,
        style: Box<dyn StyleStrategy>,
    ) -> Self {
        Self {
            allow_missing: true,
            ..Self::new(job_id, store, style)
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Use `regions` to rebuild the job's region strategy
    pub fn with_regions(mut self, regions: RegionRegistry) -> Self {
        self.regions = regions;
        self
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn load(&self) -> Result<Option<Job>> {
        match Job::find_by_id(self.store.as_ref(), self.job_id).await {
            Ok(job) => Ok(Some(job)),
            Err(GeotallyError::Read(_)) if self.allow_missing => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Encoded, styled results if the job is finished; `NotReady` otherwise.
    pub async fn try_get(&self) -> Result<Value> {
        let job = match self.load().await? {
            Some(job) if job.is_finished() => job,
            _ => return Err(GeotallyError::not_ready(self.job_id.to_string())),
        };

        let region = job.region_strategy(&self.regions)?;
        let mut style = self.style.clone();
        region.encode(job.results(), style.as_mut())
    }

    /// Poll until the job finishes or `timeout` runs out.
    ///
    /// Returns `NotReady` only once `timeout` has fully elapsed. Any other
    /// error is returned immediately. A timeout too large to represent as an
    /// instant means waiting without a deadline.
    pub async fn get_blocking(&self, timeout: Duration) -> Result<Value> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            match self.try_get().await {
                Err(GeotallyError::NotReady { .. }) => {}
                other => return other,
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(job_id = %self.job_id, timeout_ms = timeout.as_millis() as u64, "Gave up waiting for job");
                        return Err(GeotallyError::not_ready(self.job_id.to_string()));
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    pub async fn is_finished(&self) -> Result<bool> {
        Ok(self.load().await?.is_some_and(|job| job.is_finished()))
    }
}

impl std::fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("job_id", &self.job_id)
            .field("store", &self.store.store_name())
            .field("style", &self.style)
            .field("poll_interval", &self.poll_interval)
            .field("allow_missing", &self.allow_missing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CoordinateBox;
    use crate::regions::{RegionStrategy, SimpleGrid};
    use crate::store::InMemoryJobStore;
    use crate::styles::{ColorSwatch, HeatMapStyle};

    fn style() -> Box<dyn StyleStrategy> {
        let swatch = ColorSwatch::new(["#eee", "#888", "#111"]).unwrap();
        Box::new(HeatMapStyle::new(swatch))
    }

    async fn job(store: &InMemoryJobStore) -> Job {
        let grid = SimpleGrid::new(CoordinateBox::new(0.0, 0.0, 1.0, 1.0).unwrap(), 0.5).unwrap();
        Job::create(store, "count_tweets", grid.to_record().unwrap(), 2)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_not_ready_then_encoded() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut job = job(&store).await;
        let handle = ResultHandle::new(job.id(), store.clone(), style());

        job.add_result(CoordinateBox::new(0.0, 0.0, 0.5, 0.5).unwrap(), 0.0);
        job.save(store.as_ref()).await.unwrap();
        assert!(matches!(
            handle.try_get().await,
            Err(GeotallyError::NotReady { .. })
        ));
        assert!(!handle.is_finished().await.unwrap());

        job.add_result(CoordinateBox::new(0.0, 0.5, 0.5, 1.0).unwrap(), 4.0);
        job.save(store.as_ref()).await.unwrap();
        assert!(handle.is_finished().await.unwrap());

        let encoded = handle.try_get().await.unwrap();
        let features = encoded["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["fill"], "#eee");
        assert_eq!(features[1]["properties"]["fill"], "#111");
        assert_eq!(features[1]["properties"]["value"], 4.0);
    }

    #[tokio::test]
    async fn test_missing_job() {
        let store = Arc::new(InMemoryJobStore::new());
        let strict = ResultHandle::new(Uuid::new_v4(), store.clone(), style());
        assert!(matches!(strict.try_get().await, Err(GeotallyError::Read(_))));

        let pending = ResultHandle::for_pending_job(Uuid::new_v4(), store, style());
        assert!(matches!(
            pending.try_get().await,
            Err(GeotallyError::NotReady { .. })
        ));
        assert!(!pending.is_finished().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_blocking_waits_out_the_timeout() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = job(&store).await;
        let handle = ResultHandle::new(job.id(), store, style())
            .with_poll_interval(Duration::from_millis(20));

        let timeout = Duration::from_millis(150);
        let started = std::time::Instant::now();
        let err = handle.get_blocking(timeout).await.unwrap_err();

        assert!(matches!(err, GeotallyError::NotReady { .. }));
        assert!(started.elapsed() >= timeout);
    }

    #[tokio::test]
    async fn test_get_blocking_returns_once_finished() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut job = job(&store).await;
        let handle = ResultHandle::new(job.id(), store.clone(), style())
            .with_poll_interval(Duration::from_millis(10));

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            job.add_result(CoordinateBox::new(0.0, 0.0, 0.5, 0.5).unwrap(), 2.0);
            job.add_result(CoordinateBox::new(0.0, 0.5, 0.5, 1.0).unwrap(), 2.0);
            job.save(store.as_ref()).await.unwrap();
        });

        let encoded = handle.get_blocking(Duration::from_secs(5)).await.unwrap();
        assert_eq!(encoded["features"].as_array().unwrap().len(), 2);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_blocking_with_unbounded_timeout() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut job = job(&store).await;
        let handle = ResultHandle::new(job.id(), store.clone(), style())
            .with_poll_interval(Duration::from_millis(10));

        let waiter = tokio::spawn(async move { handle.get_blocking(Duration::MAX).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());
        job.add_result(CoordinateBox::new(0.0, 0.0, 0.5, 0.5).unwrap(), 1.0);
        job.add_result(CoordinateBox::new(0.0, 0.5, 0.5, 1.0).unwrap(), 3.0);
        job.save(store.as_ref()).await.unwrap();

        let encoded = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter sees the finished job")
            .unwrap()
            .unwrap();
        assert_eq!(encoded["features"].as_array().unwrap().len(), 2);
    }
}
