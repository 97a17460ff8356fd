//! Error types for lock acquisition and release.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur while acquiring, renewing, or releasing a lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// `name` was empty or whitespace-only.
    #[error("lock name must not be empty or whitespace")]
    InvalidName,

    /// The caller's cancellation token fired before the operation completed.
    #[error("lock operation cancelled")]
    Cancelled,

    /// The handle is no longer valid (released, or its lease has expired).
    #[error("lock '{0}' is no longer valid")]
    Expired(String),

    /// The underlying driver call failed for a reason other than a
    /// duplicate-key race, which is handled internally and never surfaced.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongofleet_driver::MongoError),
}

impl LockError {
    /// True if this is the "lease expired" variant.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }

    /// True if this is the "operation cancelled" variant.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_display_includes_name() {
        let err = LockError::Expired("migrations".to_string());
        assert!(err.to_string().contains("migrations"));
        assert!(err.is_expired());
    }

    #[test]
    fn cancelled_is_cancelled() {
        assert!(LockError::Cancelled.is_cancelled());
        assert!(!LockError::InvalidName.is_cancelled());
    }
}
