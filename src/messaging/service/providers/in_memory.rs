//! # In-Memory Messaging Service
//!
//! Thread-safe in-memory queues for tests and single-process runs.
//!
//! - **Visibility Timeout**: received messages are hidden until the timeout
//!   passes, then handed out again with a higher receive count
//! - **Outage Simulation**: [`InMemoryMessagingService::set_unavailable`]
//!   makes every transport call fail with a connection error

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::messaging::service::traits::MessagingService;
use crate::messaging::service::types::{MessageId, QueueStats, QueuedMessage, ReceiptHandle};
use crate::messaging::MessagingError;

#[derive(Debug, Clone)]
struct InMemoryQueuedMessage {
    id: u64,
    payload: Value,
    enqueued_at: DateTime<Utc>,
    /// None = visible now
    visible_at: Option<DateTime<Utc>>,
    receive_count: u32,
}

#[derive(Debug)]
struct InMemoryQueue {
    messages: VecDeque<InMemoryQueuedMessage>,
    next_id: AtomicU64,
    total_sent: AtomicU64,
    total_received: AtomicU64,
    total_deleted: AtomicU64,
}

impl InMemoryQueue {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            next_id: AtomicU64::new(1),
            total_sent: AtomicU64::new(0),
            total_received: AtomicU64::new(0),
            total_deleted: AtomicU64::new(0),
        }
    }
}

/// Lifetime counters of one in-memory queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounters {
    pub sent: u64,
    pub received: u64,
    pub deleted: u64,
}

/// In-memory messaging service
///
/// ```rust
/// use geotally::messaging::{InMemoryMessagingService, MessagingService};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = InMemoryMessagingService::new();
/// service.ensure_queue("geotally_tasks").await?;
/// service
///     .send_message("geotally_tasks", &serde_json::json!({"job_id": "j"}))
///     .await?;
///
/// let received = service
///     .receive_message("geotally_tasks", Duration::from_secs(30))
///     .await?;
/// assert!(received.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryMessagingService {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
    unavailable: AtomicBool,
}

impl Default for InMemoryMessagingService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessagingService {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create with pre-initialized queues
    pub fn with_queues(queue_names: &[&str]) -> Self {
        let queues = queue_names
            .iter()
            .map(|name| (name.to_string(), InMemoryQueue::new()))
            .collect();
        Self {
            queues: RwLock::new(queues),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every transport call fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Messages still owned by the queue, visible or not (for testing)
    pub async fn queue_length(&self, queue_name: &str) -> usize {
        let queues = self.queues.read().await;
        queues
            .get(queue_name)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }

    pub async fn counters(&self, queue_name: &str) -> Option<QueueCounters> {
        let queues = self.queues.read().await;
        queues.get(queue_name).map(|q| QueueCounters {
            sent: q.total_sent.load(Ordering::Relaxed),
            received: q.total_received.load(Ordering::Relaxed),
            deleted: q.total_deleted.load(Ordering::Relaxed),
        })
    }

    /// Snapshot of queued payloads in FIFO order (for testing)
    pub async fn peek_payloads(&self, queue_name: &str) -> Vec<Value> {
        let queues = self.queues.read().await;
        queues
            .get(queue_name)
            .map(|q| q.messages.iter().map(|m| m.payload.clone()).collect())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), MessagingError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MessagingError::connection(
                "in-memory transport marked unavailable",
            ));
        }
        Ok(())
    }

    fn parse_handle(receipt_handle: &ReceiptHandle) -> Result<u64, MessagingError> {
        receipt_handle
            .as_str()
            .parse()
            .map_err(|_| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))
    }
}

#[async_trait]
impl MessagingService for InMemoryMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        self.check_available()?;
        let mut queues = self.queues.write().await;
        queues
            .entry(queue_name.to_string())
            .or_insert_with(InMemoryQueue::new);
        Ok(())
    }

    async fn send_message(
        &self,
        queue_name: &str,
        payload: &Value,
    ) -> Result<MessageId, MessagingError> {
        self.check_available()
            .map_err(|e| MessagingError::send(queue_name, e.to_string()))?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let id = queue.next_id.fetch_add(1, Ordering::Relaxed);
        queue.total_sent.fetch_add(1, Ordering::Relaxed);
        queue.messages.push_back(InMemoryQueuedMessage {
            id,
            payload: payload.clone(),
            enqueued_at: Utc::now(),
            visible_at: None,
            receive_count: 0,
        });

        Ok(MessageId::from(id))
    }

    async fn receive_message(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage<Value>>, MessagingError> {
        self.check_available()
            .map_err(|e| MessagingError::receive(queue_name, e.to_string()))?;

        let timeout = chrono::Duration::from_std(visibility_timeout)
            .map_err(|e| MessagingError::receive(queue_name, e.to_string()))?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Utc::now();
        let Some(msg) = queue
            .messages
            .iter_mut()
            .find(|m| m.visible_at.map(|vt| vt <= now).unwrap_or(true))
        else {
            return Ok(None);
        };

        msg.visible_at = Some(now + timeout);
        msg.receive_count += 1;
        queue.total_received.fetch_add(1, Ordering::Relaxed);

        Ok(Some(QueuedMessage::new(
            ReceiptHandle::from(msg.id),
            msg.payload.clone(),
            msg.receive_count,
            msg.enqueued_at,
        )))
    }

    async fn delete_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        self.check_available()
            .map_err(|e| MessagingError::ack(queue_name, e.to_string()))?;
        let message_id = Self::parse_handle(receipt_handle)?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let pos = queue
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| MessagingError::message_not_found(queue_name, message_id.to_string()))?;
        queue.messages.remove(pos);
        queue.total_deleted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn queue_stats(&self, queue_name: &str) -> Result<QueueStats, MessagingError> {
        let queues = self.queues.read().await;
        let queue = queues
            .get(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Utc::now();
        let in_flight_count = queue
            .messages
            .iter()
            .filter(|m| m.visible_at.map(|vt| vt > now).unwrap_or(false))
            .count() as u64;

        let mut stats = QueueStats::new(queue_name, queue.messages.len() as u64)
            .with_in_flight_count(in_flight_count);
        if let Some(age) = queue
            .messages
            .front()
            .and_then(|m| (now - m.enqueued_at).to_std().ok())
        {
            stats = stats.with_oldest_message_age(age);
        }
        Ok(stats)
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
