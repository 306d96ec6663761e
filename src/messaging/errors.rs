//! # Messaging Error Types
//!
//! Structured errors for queue transports and the work queue layer built on
//! top of them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Queue creation failed: {queue_name}: {message}")]
    QueueCreation { queue_name: String, message: String },

    #[error("Send failed: {queue_name}: {message}")]
    Send { queue_name: String, message: String },

    #[error("Receive failed: {queue_name}: {message}")]
    Receive { queue_name: String, message: String },

    #[error("Acknowledge failed: {queue_name}: {message}")]
    Ack { queue_name: String, message: String },

    #[error("Message not found: {queue_name}: {message_id}")]
    MessageNotFound {
        queue_name: String,
        message_id: String,
    },

    #[error("Invalid receipt handle: {handle}")]
    InvalidReceiptHandle { handle: String },

    #[error("Item was never polled from {queue_name}: {identity}")]
    NotInFlight {
        queue_name: String,
        identity: String,
    },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },
}

impl MessagingError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    pub fn queue_creation(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueueCreation {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    pub fn send(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    pub fn receive(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Receive {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    pub fn ack(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ack {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    pub fn message_not_found(queue_name: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self::MessageNotFound {
            queue_name: queue_name.into(),
            message_id: message_id.into(),
        }
    }

    pub fn invalid_receipt_handle(handle: impl Into<String>) -> Self {
        Self::InvalidReceiptHandle {
            handle: handle.into(),
        }
    }

    pub fn not_in_flight(queue_name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self::NotInFlight {
            queue_name: queue_name.into(),
            identity: identity.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Transport hiccups are retryable; protocol misuse is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Send { .. } | Self::Receive { .. } | Self::Ack { .. }
        )
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            MessagingError::deserialization(err.to_string())
        } else {
            MessagingError::serialization(err.to_string())
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for MessagingError {
    fn from(err: sqlx::Error) -> Self {
        MessagingError::connection(err.to_string())
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
