//! Error types for option validation, collection-name resolution, and the
//! top-level [`crate::MongoFleet`] facade.

use thiserror::Error;

/// Result type for facade-level operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building or using [`crate::options::MongoFleetOptions`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `url` was unset, or a `collection_type_map` entry was empty/whitespace.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// [`crate::collection_names::CollectionNameResolver::resolve`] found no
    /// mapped name for a type and `use_default_collection_names` is `false`.
    #[error("no collection name configured for type '{0}'")]
    UnresolvedCollection(String),
}

impl ConfigError {
    /// Create an invalid-configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for [`crate::MongoFleet`] operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors surfaced by the [`crate::MongoFleet`] facade: connecting, resolving
/// collection names, and delegating to the underlying coordination crates.
#[derive(Error, Debug)]
pub enum FleetError {
    /// Options failed validation, or a collection name couldn't be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The connection URL couldn't be parsed to extract a database name.
    #[error("invalid connection url: {0}")]
    InvalidUrl(String),

    /// The underlying driver call failed.
    #[error(transparent)]
    Driver(#[from] mongofleet_driver::MongoError),

    /// A lock operation failed.
    #[error(transparent)]
    Lock(#[from] mongofleet_lock::LockError),

    /// A migration run failed.
    #[error(transparent)]
    Migrate(#[from] mongofleet_migrate::MigrateError),

    /// A queue operation failed.
    #[error(transparent)]
    Queue(#[from] mongofleet_queue::QueueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_collection_names_the_type() {
        let err = ConfigError::UnresolvedCollection("myapp::Widget".to_string());
        assert!(err.to_string().contains("myapp::Widget"));
    }
}
