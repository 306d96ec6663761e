use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use super::task_handler::TaskHandlerRegistry;
use crate::error::Result;
use crate::logging::log_queue_operation;
use crate::messaging::{ResultMessage, ResultQueue, TaskMessage, TaskQueue};
use crate::processing::{ItemProcessor, PollOutcome};

/// Consumes tasks, computes their values and publishes results.
///
/// A task is acknowledged only after its result is posted. Any failure
/// before that releases it locally so the transport redelivers it, which
/// means a task can be computed (and its result posted) more than once.
#[derive(Debug)]
pub struct Worker {
    task_queue: Arc<TaskQueue>,
    result_queue: Arc<ResultQueue>,
    handlers: TaskHandlerRegistry,
}

impl Worker {
    pub fn new(
        task_queue: Arc<TaskQueue>,
        result_queue: Arc<ResultQueue>,
        handlers: TaskHandlerRegistry,
    ) -> Self {
        Self {
            task_queue,
            result_queue,
            handlers,
        }
    }

    #[instrument(skip(self, task), fields(job_id = %task.job_id, task = %task.task))]
    async fn perform(&self, task: &TaskMessage) -> Result<()> {
        let started = Instant::now();
        let handler = self.handlers.get(&task.task)?;
        let value = handler.compute(task).await?;

        let result = ResultMessage::for_task(task, value)
            .with_run_time(started.elapsed().as_secs_f64());
        self.result_queue.post(&result).await?;
        self.task_queue.finish(task).await?;

        debug!(value, coordinate_box = %task.coordinate_box, "Task complete");
        Ok(())
    }
}

#[async_trait]
impl ItemProcessor for Worker {
    fn name(&self) -> &'static str {
        "worker"
    }

    async fn process_next(&self) -> Result<PollOutcome> {
        let Some(task) = self.task_queue.poll().await? else {
            return Ok(PollOutcome::Empty);
        };
        log_queue_operation("received", self.task_queue.queue_name(), &task.job_id, &task.task);

        match self.perform(&task).await {
            Ok(()) => Ok(PollOutcome::Processed),
            Err(e) => {
                self.task_queue.release(&task);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeotallyError;
    use crate::geo::CoordinateBox;
    use crate::messaging::InMemoryMessagingService;
    use crate::source::{InMemoryTweetSource, Tweet};
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    struct Fixture {
        service: Arc<InMemoryMessagingService>,
        tasks: Arc<TaskQueue>,
        results: Arc<ResultQueue>,
        worker: Worker,
    }

    fn fixture() -> Fixture {
        let service = Arc::new(InMemoryMessagingService::with_queues(&["tasks", "results"]));
        let tasks = Arc::new(TaskQueue::new(service.clone(), "tasks", Duration::ZERO));
        let results = Arc::new(ResultQueue::new(service.clone(), "results", Duration::ZERO));
        let source = Arc::new(InMemoryTweetSource::with_tweets([
            Tweet::new("a", 0.25, 0.25, Utc::now()).unwrap(),
            Tweet::new("b", 0.75, 0.75, Utc::now()).unwrap(),
        ]));
        let worker = Worker::new(
            tasks.clone(),
            results.clone(),
            TaskHandlerRegistry::with_defaults(source),
        );
        Fixture {
            service,
            tasks,
            results,
            worker,
        }
    }

    fn cell() -> CoordinateBox {
        CoordinateBox::new(0.0, 0.0, 0.5, 0.5).unwrap()
    }

    #[tokio::test]
    async fn test_task_becomes_result_and_is_acked() {
        let f = fixture();
        let task = TaskMessage::new(Uuid::new_v4(), "count_tweets", cell());
        f.tasks.post(&task).await.unwrap();

        assert_eq!(f.worker.process_next().await.unwrap(), PollOutcome::Processed);
        assert_eq!(f.service.queue_length("tasks").await, 0);

        let result = f.results.poll().await.unwrap().unwrap();
        assert_eq!(result.job_id, task.job_id);
        assert_eq!(result.coordinate_box, cell());
        assert_eq!(result.value, 1.0);
        assert!(result.run_time_secs.is_some());
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let f = fixture();
        assert_eq!(f.worker.process_next().await.unwrap(), PollOutcome::Empty);
    }

    #[tokio::test]
    async fn test_unknown_task_left_unacked() {
        let f = fixture();
        let task = TaskMessage::new(Uuid::new_v4(), "sum_likes", cell());
        f.tasks.post(&task).await.unwrap();

        let err = f.worker.process_next().await.unwrap_err();
        assert!(matches!(err, GeotallyError::UnknownTask { .. }));
        assert_eq!(f.service.queue_length("tasks").await, 1);
        assert_eq!(f.tasks.in_flight_count(), 0);
        assert_eq!(f.service.queue_length("results").await, 0);
    }

    #[tokio::test]
    async fn test_failed_publish_is_redelivered() {
        let f = fixture();
        let task = TaskMessage::new(Uuid::new_v4(), "count_tweets", cell());
        f.tasks.post(&task).await.unwrap();

        // Results queue missing: publish fails, task stays on the transport
        let broken = Worker::new(
            f.tasks.clone(),
            Arc::new(ResultQueue::new(f.service.clone(), "missing", Duration::ZERO)),
            TaskHandlerRegistry::with_defaults(Arc::new(InMemoryTweetSource::new())),
        );
        assert!(broken.process_next().await.is_err());
        assert_eq!(f.service.queue_length("tasks").await, 1);

        assert_eq!(f.worker.process_next().await.unwrap(), PollOutcome::Processed);
        assert_eq!(f.service.queue_length("tasks").await, 0);
        assert_eq!(f.service.queue_length("results").await, 1);
    }
}
