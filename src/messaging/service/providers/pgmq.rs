//! # PGMQ Messaging Service
//!
//! Queue transport over the `pgmq` Postgres extension, called through its
//! SQL functions on a shared `sqlx` pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::messaging::service::traits::MessagingService;
use crate::messaging::service::types::{MessageId, QueueStats, QueuedMessage, ReceiptHandle};
use crate::messaging::MessagingError;

#[derive(Debug, Clone)]
pub struct PgmqMessagingService {
    pool: PgPool,
}

impl PgmqMessagingService {
    /// Connect with a fresh pool
    pub async fn new(database_url: &str) -> Result<Self, MessagingError> {
        let pool = PgPool::connect(database_url).await?;
        info!("Connected to pgmq");
        Ok(Self { pool })
    }

    /// Share an existing pool with the job store
    pub fn new_with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MessagingService for PgmqMessagingService {
    #[instrument(skip(self), fields(queue = %queue_name))]
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue_name)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::queue_creation(queue_name, e.to_string()))?;
        debug!("Queue ensured");
        Ok(())
    }

    #[instrument(skip(self, payload), fields(queue = %queue_name))]
    async fn send_message(
        &self,
        queue_name: &str,
        payload: &Value,
    ) -> Result<MessageId, MessagingError> {
        let message_id: i64 = sqlx::query_scalar("SELECT pgmq.send($1, $2)")
            .bind(queue_name)
            .bind(payload)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MessagingError::send(queue_name, e.to_string()))?;
        Ok(MessageId::from(message_id))
    }

    #[instrument(skip(self), fields(queue = %queue_name))]
    async fn receive_message(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage<Value>>, MessagingError> {
        let vt = i32::try_from(visibility_timeout.as_secs()).unwrap_or(i32::MAX);

        let row: Option<(i64, i32, DateTime<Utc>, Value)> = sqlx::query_as(
            "SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, 1)",
        )
        .bind(queue_name)
        .bind(vt)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::receive(queue_name, e.to_string()))?;

        Ok(row.map(|(msg_id, read_ct, enqueued_at, message)| {
            QueuedMessage::new(
                ReceiptHandle::from(msg_id),
                message,
                u32::try_from(read_ct).unwrap_or(0),
                enqueued_at,
            )
        }))
    }

    #[instrument(skip(self), fields(queue = %queue_name, receipt_handle = %receipt_handle))]
    async fn delete_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        let msg_id = receipt_handle
            .as_i64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        let deleted: bool = sqlx::query_scalar("SELECT pgmq.delete($1, $2)")
            .bind(queue_name)
            .bind(msg_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MessagingError::ack(queue_name, e.to_string()))?;

        if !deleted {
            return Err(MessagingError::message_not_found(
                queue_name,
                msg_id.to_string(),
            ));
        }
        Ok(())
    }

    async fn queue_stats(&self, queue_name: &str) -> Result<QueueStats, MessagingError> {
        let row: Option<(Option<i64>, Option<i32>)> =
            sqlx::query_as("SELECT queue_length, oldest_msg_age_sec FROM pgmq.metrics($1)")
                .bind(queue_name)
                .fetch_optional(&self.pool)
                .await?;

        let Some((queue_length, oldest_age)) = row else {
            return Err(MessagingError::queue_not_found(queue_name));
        };

        let mut stats = QueueStats::new(queue_name, queue_length.unwrap_or(0).max(0) as u64);
        if let Some(age) = oldest_age {
            stats = stats.with_oldest_message_age(Duration::from_secs(age.max(0) as u64));
        }
        Ok(stats)
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }

    fn provider_name(&self) -> &'static str {
        "pgmq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn service() -> Option<PgmqMessagingService> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        PgmqMessagingService::new(&url).await.ok()
    }

    #[tokio::test]
    async fn test_pgmq_round_trip() {
        let Some(service) = service().await else {
            eprintln!("Skipping pgmq test: TEST_DATABASE_URL not set");
            return;
        };

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let queue = format!("geotally_test_{}", &suffix[..8]);
        service.ensure_queue(&queue).await.unwrap();
        service.send_message(&queue, &json!({"n": 1})).await.unwrap();

        let msg = service
            .receive_message(&queue, Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.message, json!({"n": 1}));

        service
            .delete_message(&queue, &msg.receipt_handle)
            .await
            .unwrap();
        assert!(service
            .delete_message(&queue, &msg.receipt_handle)
            .await
            .is_err());
    }
}
