//! # Messaging Module
//!
//! Queue transports and the typed work queues built on them.
//!
//! - [`service`]: provider-agnostic transport (`write`, `read-one`,
//!   `delete-by-handle`) with in-memory and PGMQ providers
//! - [`WorkQueue`]: post / poll / finish with a local in-flight table,
//!   instantiated as [`TaskQueue`], [`ResultQueue`] and [`RequestQueue`]

pub mod errors;
pub mod message;
pub mod service;
pub mod work_queue;

pub use errors::{MessagingError, MessagingResult};
pub use message::{ItemIdentity, QueueItem, RequestMessage, ResultMessage, TaskMessage};
#[cfg(feature = "postgres")]
pub use service::PgmqMessagingService;
pub use service::{
    InMemoryMessagingService, MessageId, MessagingService, QueueStats, QueuedMessage,
    ReceiptHandle,
};
pub use work_queue::{RequestQueue, ResultQueue, TaskQueue, WorkQueue};
