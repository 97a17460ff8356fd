//! Error types for MongoDB operations.

use thiserror::Error;

/// Result type for MongoDB operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Errors that can occur during MongoDB operations.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// BSON serialization error.
    #[error("bson error: {0}")]
    Bson(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Document serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid ObjectId.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// A document field was missing or the wrong BSON type for the access requested.
    #[error("query error: {0}")]
    Query(String),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a query/field-access error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True if the underlying driver error is a duplicate-key error (code
    /// 11000).
    ///
    /// Lock acquisition and queue-item claims both race on an upsert; callers
    /// treat this case as "lost the race," not as a failure. A losing
    /// `insert_one`/bulk write surfaces this as `ErrorKind::Write`; a losing
    /// `find_one_and_update` upsert (the shape the lock manager's atomic
    /// acquire uses) surfaces it as `ErrorKind::Command` instead, since
    /// findAndModify reports its write failure as the command's own error
    /// rather than a bulk-write failure — both are checked here.
    pub fn is_duplicate_key(&self) -> bool {
        let Self::Driver(err) = self else {
            return false;
        };
        match &*err.kind {
            mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
                mongodb::error::WriteError { code: 11000, .. },
            )) => true,
            mongodb::error::ErrorKind::Command(command_error) => command_error.code == 11000,
            _ => false,
        }
    }
}

impl From<bson::oid::Error> for MongoError {
    fn from(err: bson::oid::Error) -> Self {
        MongoError::InvalidObjectId(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MongoError::config("invalid URI");
        assert!(matches!(err, MongoError::Config(_)));

        let err = MongoError::connection("connection refused");
        assert!(err.is_connection_error());

        let err = MongoError::not_found("user");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = MongoError::config("test error");
        assert_eq!(err.to_string(), "configuration error: test error");

        let err = MongoError::NotFound("user".to_string());
        assert_eq!(err.to_string(), "document not found: user");
    }

    #[test]
    fn test_is_duplicate_key_false_for_non_driver_errors() {
        let err = MongoError::config("x");
        assert!(!err.is_duplicate_key());
    }
}
