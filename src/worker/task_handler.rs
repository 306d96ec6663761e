//! # Task Handlers
//!
//! Map a task tag to the computation that produces one sub-area's value.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::constants::tasks::COUNT_TWEETS;
use crate::error::{GeotallyError, Result};
use crate::messaging::TaskMessage;
use crate::source::TweetSource;

#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// Tag this handler answers to
    fn task_name(&self) -> &'static str;

    async fn compute(&self, task: &TaskMessage) -> Result<f64>;
}

/// Counts tweets inside the task's box, optionally only recent ones.
pub struct CountTweetsHandler {
    source: Arc<dyn TweetSource>,
    max_age: Option<chrono::Duration>,
}

impl CountTweetsHandler {
    pub fn new(source: Arc<dyn TweetSource>) -> Self {
        Self {
            source,
            max_age: None,
        }
    }

    /// Only count tweets no older than `max_age` at compute time
    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

#[async_trait]
impl TaskHandler for CountTweetsHandler {
    fn task_name(&self) -> &'static str {
        COUNT_TWEETS
    }

    async fn compute(&self, task: &TaskMessage) -> Result<f64> {
        let since = self.max_age.map(|age| Utc::now() - age);
        let count = self
            .source
            .count_in_box(&task.coordinate_box, since)
            .await?;
        debug!(
            job_id = %task.job_id,
            coordinate_box = %task.coordinate_box,
            source = self.source.source_name(),
            count,
            "Counted tweets"
        );
        Ok(count as f64)
    }
}

/// Task tag to handler table. Unknown tags are an error for that task only.
#[derive(Clone, Default)]
pub struct TaskHandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `count_tweets` over `source`
    pub fn with_defaults(source: Arc<dyn TweetSource>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CountTweetsHandler::new(source)));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handlers
            .insert(handler.task_name().to_string(), handler);
    }

    pub fn get(&self, task: &str) -> Result<Arc<dyn TaskHandler>> {
        self.handlers
            .get(task)
            .cloned()
            .ok_or_else(|| GeotallyError::unknown_task(task))
    }

    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TaskHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandlerRegistry")
            .field("tasks", &self.task_names())
            .finish()
    }
}
