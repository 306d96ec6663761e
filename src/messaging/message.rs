//! # Queue Messages
//!
//! Wire formats carried by the task, result and request queues, and the
//! identity each one is deduplicated by while in flight.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::geo::CoordinateBox;

/// Unit of idempotency in a consumer's in-flight table.
///
/// `(job_id, task, coordinate_box)` for tasks and results; requests carry no
/// box and are keyed by `(job_id, task)` alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    pub job_id: Uuid,
    pub task: String,
    pub cell: Option<[u64; 4]>,
}

impl ItemIdentity {
    pub fn for_cell(job_id: Uuid, task: &str, coordinate_box: &CoordinateBox) -> Self {
        Self {
            job_id,
            task: task.to_string(),
            cell: Some(coordinate_box.key_bits()),
        }
    }

    pub fn for_job(job_id: Uuid, task: &str) -> Self {
        Self {
            job_id,
            task: task.to_string(),
            cell: None,
        }
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell {
            Some(bits) => {
                let [a, b, c, d] = bits.map(f64::from_bits);
                write!(f, "{}/{}/({a}, {b})-({c}, {d})", self.job_id, self.task)
            }
            None => write!(f, "{}/{}", self.job_id, self.task),
        }
    }
}

/// A message type that can travel through a [`WorkQueue`](super::WorkQueue).
pub trait QueueItem: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Short label used in logs
    const KIND: &'static str;

    fn identity(&self) -> ItemIdentity;
}

/// One sub-area of a job, waiting for a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub job_id: Uuid,
    pub task: String,
    pub coordinate_box: CoordinateBox,
}

impl TaskMessage {
    pub fn new(job_id: Uuid, task: impl Into<String>, coordinate_box: CoordinateBox) -> Self {
        Self {
            job_id,
            task: task.into(),
            coordinate_box,
        }
    }
}

impl QueueItem for TaskMessage {
    const KIND: &'static str = "task";

    fn identity(&self) -> ItemIdentity {
        ItemIdentity::for_cell(self.job_id, &self.task, &self.coordinate_box)
    }
}

/// A computed sub-area value on its way to the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub job_id: Uuid,
    pub task: String,
    pub coordinate_box: CoordinateBox,
    pub value: f64,
    /// Wall time the worker spent computing `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time_secs: Option<f64>,
}

impl ResultMessage {
    /// Result for `task`, same identity as the task it answers
    pub fn for_task(task: &TaskMessage, value: f64) -> Self {
        Self {
            job_id: task.job_id,
            task: task.task.clone(),
            coordinate_box: task.coordinate_box,
            value,
            run_time_secs: None,
        }
    }

    pub fn with_run_time(mut self, secs: f64) -> Self {
        self.run_time_secs = Some(secs);
        self
    }
}

impl QueueItem for ResultMessage {
    const KIND: &'static str = "result";

    fn identity(&self) -> ItemIdentity {
        ItemIdentity::for_cell(self.job_id, &self.task, &self.coordinate_box)
    }
}

/// A whole-region request accepted by the API and not yet decomposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub job_id: Uuid,
    pub task: String,
    /// Tagged record of the region strategy
    pub region_strategy: Value,
}

impl QueueItem for RequestMessage {
    const KIND: &'static str = "request";

    fn identity(&self) -> ItemIdentity {
        ItemIdentity::for_job(self.job_id, &self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell() -> CoordinateBox {
        CoordinateBox::new(0.0, 0.0, 0.5, 0.5).unwrap()
    }

    #[test]
    fn test_task_and_result_share_identity() {
        let task = TaskMessage::new(Uuid::new_v4(), "count_tweets", cell());
        let result = ResultMessage::for_task(&task, 3.0);
        assert_eq!(task.identity(), result.identity());
    }

    #[test]
    fn test_request_identity_has_no_cell() {
        let request = RequestMessage {
            job_id: Uuid::new_v4(),
            task: "count_tweets".to_string(),
            region_strategy: json!({"variant": "simple_grid"}),
        };
        assert_eq!(request.identity().cell, None);
    }

    #[test]
    fn test_result_wire_format() {
        let job_id = Uuid::nil();
        let result = ResultMessage::for_task(&TaskMessage::new(job_id, "count_tweets", cell()), 7.0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            json!({
                "job_id": "00000000-0000-0000-0000-000000000000",
                "task": "count_tweets",
                "coordinate_box": {"min_lat": 0.0, "min_lon": 0.0, "max_lat": 0.5, "max_lon": 0.5},
                "value": 7.0
            })
        );

        let timed = result.with_run_time(0.25);
        let json = serde_json::to_value(&timed).unwrap();
        assert_eq!(json["run_time_secs"], json!(0.25));
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let parsed = serde_json::from_value::<TaskMessage>(json!({
            "job_id": Uuid::new_v4(),
            "task": "count_tweets"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_identity_display() {
        let identity = ItemIdentity::for_job(Uuid::nil(), "count_tweets");
        assert_eq!(
            identity.to_string(),
            "00000000-0000-0000-0000-000000000000/count_tweets"
        );
    }
}
