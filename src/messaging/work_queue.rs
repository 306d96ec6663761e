//! # Work Queue
//!
//! Typed at-least-once queue with explicit acknowledgment and a local
//! in-flight table.
//!
//! The in-flight table maps an item's [`ItemIdentity`] to the receipt handle
//! the transport gave us. It lives only in this consumer's memory: after a
//! crash it is gone, and anything polled but never finished comes back
//! through the transport's visibility timeout instead.

use dashmap::DashMap;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::message::{ItemIdentity, QueueItem, RequestMessage, ResultMessage, TaskMessage};
use super::service::{MessageId, MessagingService, ReceiptHandle};
use super::MessagingError;
use crate::error::Result;

pub type TaskQueue = WorkQueue<TaskMessage>;
pub type ResultQueue = WorkQueue<ResultMessage>;
pub type RequestQueue = WorkQueue<RequestMessage>;

pub struct WorkQueue<M: QueueItem> {
    service: Arc<dyn MessagingService>,
    queue_name: String,
    visibility_timeout: Duration,
    in_flight: DashMap<ItemIdentity, ReceiptHandle>,
    _item: PhantomData<fn() -> M>,
}

impl<M: QueueItem> WorkQueue<M> {
    pub fn new(
        service: Arc<dyn MessagingService>,
        queue_name: impl Into<String>,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            service,
            queue_name: queue_name.into(),
            visibility_timeout,
            in_flight: DashMap::new(),
            _item: PhantomData,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Create the underlying transport queue if needed
    pub async fn ensure(&self) -> Result<()> {
        self.service.ensure_queue(&self.queue_name).await?;
        Ok(())
    }

    /// Serialize and durably enqueue `item`
    #[instrument(skip(self, item), fields(queue = %self.queue_name, kind = M::KIND))]
    pub async fn post(&self, item: &M) -> Result<MessageId> {
        let payload = serde_json::to_value(item).map_err(MessagingError::from)?;
        let message_id = self.service.send_message(&self.queue_name, &payload).await?;
        debug!(identity = %item.identity(), message_id = %message_id, "Posted item");
        Ok(message_id)
    }

    /// Read at most one item.
    ///
    /// A message that does not parse as `M` is skipped without being deleted,
    /// so the transport's own redrive policy decides its fate.
    #[instrument(skip(self), fields(queue = %self.queue_name, kind = M::KIND))]
    pub async fn poll(&self) -> Result<Option<M>> {
        let Some(received) = self
            .service
            .receive_message(&self.queue_name, self.visibility_timeout)
            .await?
        else {
            return Ok(None);
        };

        let item = match parse_item::<M>(&received.message) {
            Ok(item) => item,
            Err(error) => {
                warn!(
                    receipt_handle = %received.receipt_handle,
                    receive_count = received.receive_count,
                    error = %error,
                    "Dropping malformed message from local view"
                );
                return Ok(None);
            }
        };

        let identity = item.identity();
        if let Some(previous) = self
            .in_flight
            .insert(identity.clone(), received.receipt_handle.clone())
        {
            debug!(
                identity = %identity,
                previous_handle = %previous,
                receipt_handle = %received.receipt_handle,
                "Item redelivered while still in flight"
            );
        }
        Ok(Some(item))
    }

    /// Acknowledge a polled item: delete its transport message and forget it.
    ///
    /// Finishing an item this consumer never polled is an error. If the
    /// delete fails the entry stays so the call can be retried.
    #[instrument(skip(self, item), fields(queue = %self.queue_name, kind = M::KIND))]
    pub async fn finish(&self, item: &M) -> Result<()> {
        let identity = item.identity();
        let handle = self
            .in_flight
            .get(&identity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MessagingError::not_in_flight(&self.queue_name, identity.to_string()))?;

        self.service
            .delete_message(&self.queue_name, &handle)
            .await?;
        self.in_flight
            .remove_if(&identity, |_, current| *current == handle);

        debug!(identity = %identity, receipt_handle = %handle, "Finished item");
        Ok(())
    }

    /// Forget a polled item without deleting it; the transport redelivers it
    /// after the visibility timeout. Returns whether it was in flight.
    pub fn release(&self, item: &M) -> bool {
        self.in_flight.remove(&item.identity()).is_some()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, item: &M) -> bool {
        self.in_flight.contains_key(&item.identity())
    }
}

impl<M: QueueItem> std::fmt::Debug for WorkQueue<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("queue_name", &self.queue_name)
            .field("kind", &M::KIND)
            .field("provider", &self.service.provider_name())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

fn parse_item<M: QueueItem>(payload: &Value) -> std::result::Result<M, MessagingError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| MessagingError::deserialization(e.to_string()))
}
