//! # Messaging Service Traits
//!
//! The queue transport contract: write, read one, delete by handle.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::types::{MessageId, QueueStats, QueuedMessage, ReceiptHandle};
use crate::messaging::MessagingError;

/// Provider-agnostic at-least-once queue transport.
///
/// Payloads are JSON values so the trait stays object safe; typed access
/// lives in [`WorkQueue`](crate::messaging::WorkQueue). A received message
/// stays invisible to other consumers for the visibility timeout and comes
/// back if it is not deleted in time.
#[async_trait]
pub trait MessagingService: Send + Sync + 'static {
    /// Create a queue if it doesn't exist (idempotent)
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError>;

    async fn ensure_queues(&self, queue_names: &[String]) -> Result<(), MessagingError> {
        for queue_name in queue_names {
            self.ensure_queue(queue_name).await?;
        }
        Ok(())
    }

    async fn send_message(
        &self,
        queue_name: &str,
        payload: &Value,
    ) -> Result<MessageId, MessagingError>;

    /// Read at most one visible message without blocking
    async fn receive_message(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage<Value>>, MessagingError>;

    /// Permanently remove a received message
    async fn delete_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError>;

    async fn queue_stats(&self, queue_name: &str) -> Result<QueueStats, MessagingError>;

    async fn health_check(&self) -> Result<bool, MessagingError>;

    fn provider_name(&self) -> &'static str;

    /// Startup check: the transport answers its health check and every named
    /// queue reports stats. Each queue's backlog is logged.
    async fn check_ready(&self, queue_names: &[String]) -> Result<Vec<QueueStats>, MessagingError> {
        if !self.health_check().await? {
            return Err(MessagingError::connection(format!(
                "{} transport failed its health check",
                self.provider_name()
            )));
        }

        let mut all_stats = Vec::with_capacity(queue_names.len());
        for queue_name in queue_names {
            let stats = self.queue_stats(queue_name).await?;
            info!(
                provider = self.provider_name(),
                queue = %queue_name,
                backlog = stats.message_count,
                in_flight = ?stats.in_flight_count,
                oldest_message_age = ?stats.oldest_message_age,
                "Queue ready"
            );
            all_stats.push(stats);
        }
        Ok(all_stats)
    }
}
