//! Error types for publishing and subscribing to queues.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while publishing to, or processing, a queue.
#[derive(Error, Debug)]
pub enum QueueError {
    /// A required argument was null/empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `QueueDefinition::payload_type` didn't match the generic `P`, or
    /// `collection_name` was empty.
    #[error("queue configuration error: {0}")]
    Configuration(String),

    /// No handler was registered for the payload type.
    #[error("no handler registered for payload type '{0}'")]
    HandlerNotRegistered(String),

    /// The subscription was used in a state that doesn't support the
    /// requested transition (e.g. `start()` after `dispose()`).
    #[error("subscription state error: {0}")]
    State(String),

    /// The underlying driver call failed.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongofleet_driver::MongoError),
}

impl QueueError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_carries_message() {
        let err = QueueError::configuration("payload_type mismatch");
        assert!(err.to_string().contains("payload_type mismatch"));
    }

    #[test]
    fn handler_not_registered_names_the_type() {
        let err = QueueError::HandlerNotRegistered("Widget".to_string());
        assert!(err.to_string().contains("Widget"));
    }
}
