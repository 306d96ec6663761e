//! # Messaging Service
//!
//! Transport abstraction under the work queues, with an in-memory provider
//! for tests and single-process runs and a PGMQ provider for deployments.

pub mod providers;
pub mod traits;
pub mod types;

pub use providers::InMemoryMessagingService;
#[cfg(feature = "postgres")]
pub use providers::PgmqMessagingService;
pub use traits::MessagingService;
pub use types::{MessageId, QueueStats, QueuedMessage, ReceiptHandle};
