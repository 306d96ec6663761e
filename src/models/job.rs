//! # Job Model
//!
//! Durable record of one aggregate request: the serialized region strategy it
//! was decomposed with, how many sub-area results it expects, and the
//! results accumulated so far.
//!
//! ## Lifecycle
//!
//! - Created by the orchestrator with no results and `finished = false`
//! - Mutated only by reducers, one result at a time
//! - Read by result handles until `finished` flips
//!
//! Jobs are never deleted here; retention belongs to the store.
//!
//! ## Concurrency
//!
//! [`Job::save`] writes `results`, `finished` and `run_times` wholesale with
//! no version check. Two reducers saving the same job concurrently race and
//! the last write wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GeotallyError, Result};
use crate::geo::{CoordinateBox, SubAreaResult};
use crate::regions::{RegionRegistry, RegionStrategy};
use crate::store::{JobChanges, JobStore};

/// Stored form of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub task: String,
    /// Tagged record of the region strategy, fixed at creation
    pub region_strategy: Value,
    pub expected_sub_areas: usize,
    /// Arrival order, not spatial order
    pub results: Vec<SubAreaResult>,
    pub finished: bool,
    /// Subtask name to latest observed duration in seconds
    pub run_times: HashMap<String, f64>,
}

impl JobRecord {
    pub fn new(id: Uuid, task: impl Into<String>, region_strategy: Value, expected_sub_areas: usize) -> Self {
        Self {
            id,
            task: task.into(),
            region_strategy,
            expected_sub_areas,
            results: Vec::new(),
            finished: false,
            run_times: HashMap::new(),
        }
    }

    pub fn changes(&self) -> JobChanges {
        JobChanges {
            results: self.results.clone(),
            finished: self.finished,
            run_times: self.run_times.clone(),
        }
    }
}

/// A loaded job with local, unsaved modifications tracked.
#[derive(Debug, Clone)]
pub struct Job {
    record: JobRecord,
    dirty: bool,
}

impl Job {
    /// Persist a new job under a fresh id
    pub async fn create(
        store: &dyn JobStore,
        task: &str,
        region_strategy: Value,
        expected_sub_areas: usize,
    ) -> Result<Self> {
        Self::create_with_id(store, Uuid::new_v4(), task, region_strategy, expected_sub_areas).await
    }

    /// Persist a new job under a caller-chosen id
    pub async fn create_with_id(
        store: &dyn JobStore,
        id: Uuid,
        task: &str,
        region_strategy: Value,
        expected_sub_areas: usize,
    ) -> Result<Self> {
        if expected_sub_areas == 0 {
            return Err(GeotallyError::Validation(format!(
                "job {id} must expect at least one sub-area"
            )));
        }

        let record = JobRecord::new(id, task, region_strategy, expected_sub_areas);
        store.create(&record).await?;
        debug!(job_id = %id, task = %task, expected_sub_areas, "Created job");

        Ok(Self {
            record,
            dirty: false,
        })
    }

    /// Load a job, failing with [`GeotallyError::Read`] when it does not exist
    pub async fn find_by_id(store: &dyn JobStore, id: Uuid) -> Result<Self> {
        let record = store.read(id).await?;
        Ok(Self::from_record(record))
    }

    pub fn from_record(record: JobRecord) -> Self {
        Self {
            record,
            dirty: false,
        }
    }

    /// Append one sub-area result.
    ///
    /// `finished` flips once the result count reaches the expected count and
    /// never reverts, even if redelivered duplicates push it past.
    pub fn add_result(&mut self, coordinate_box: CoordinateBox, value: f64) {
        self.record
            .results
            .push(SubAreaResult::new(coordinate_box, value));
        if !self.record.finished && self.record.results.len() >= self.record.expected_sub_areas {
            self.record.finished = true;
        }
        self.dirty = true;
    }

    /// Record a subtask duration; last write wins
    pub fn add_run_time(&mut self, subtask: &str, secs: f64) {
        if self.record.run_times.get(subtask) != Some(&secs) {
            self.record.run_times.insert(subtask.to_string(), secs);
            self.dirty = true;
        }
    }

    /// Write pending changes. A clean job is not written at all.
    pub async fn save(&mut self, store: &dyn JobStore) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        store.update(self.record.id, &self.record.changes()).await?;
        self.dirty = false;
        debug!(
            job_id = %self.record.id,
            results = self.record.results.len(),
            finished = self.record.finished,
            "Saved job"
        );
        Ok(())
    }

    /// Rebuild the region strategy stored on the job
    pub fn region_strategy(&self, registry: &RegionRegistry) -> Result<Box<dyn RegionStrategy>> {
        registry.from_record(&self.record.region_strategy)
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn task(&self) -> &str {
        &self.record.task
    }

    pub fn expected_sub_areas(&self) -> usize {
        self.record.expected_sub_areas
    }

    pub fn results(&self) -> &[SubAreaResult] {
        &self.record.results
    }

    pub fn is_finished(&self) -> bool {
        self.record.finished
    }

    pub fn run_times(&self) -> &HashMap<String, f64> {
        &self.record.run_times
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }
}
