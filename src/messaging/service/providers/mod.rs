//! Messaging providers.

mod in_memory;
#[cfg(feature = "postgres")]
mod pgmq;

pub use in_memory::InMemoryMessagingService;
#[cfg(feature = "postgres")]
pub use pgmq::PgmqMessagingService;
