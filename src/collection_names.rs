//! Type-to-collection-name resolution, and the queue collection-name
//! generator.
//!
//! An explicit `collection_type_map` entry wins; otherwise, if
//! `use_default_collection_names` is set, the type's short name (the final
//! `::`-separated segment of [`std::any::type_name`]) is used. Queues that
//! don't supply an explicit name instead get a generated one, keyed off the
//! payload type's fully qualified name so two processes that agree on a
//! payload type always agree on its collection.

use std::any::type_name;
use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64;

use crate::error::{ConfigError, ConfigResult};

/// Prefix every generated queue collection name carries.
pub const QUEUE_COLLECTION_PREFIX: &str = "_Queue";

/// Resolves a Rust type to the collection name it's stored under.
///
/// Built from an explicit `type_name() -> collection_name` map plus a
/// fallback policy; the core never constructs collection names on its own,
/// it only calls through this resolver.
#[derive(Debug, Clone)]
pub struct CollectionNameResolver {
    type_map: HashMap<String, String>,
    use_default_collection_names: bool,
}

impl CollectionNameResolver {
    /// Build a resolver over an explicit map and the default-name fallback
    /// policy.
    pub fn new(type_map: HashMap<String, String>, use_default_collection_names: bool) -> Self {
        Self {
            type_map,
            use_default_collection_names,
        }
    }

    /// Resolve the collection name for `T`.
    ///
    /// Checks `type_map` first (keyed by `std::any::type_name::<T>()`);
    /// falls back to `T`'s short name if `use_default_collection_names` is
    /// set, otherwise fails with [`ConfigError::UnresolvedCollection`].
    pub fn resolve<T: 'static>(&self) -> ConfigResult<String> {
        let full_name = type_name::<T>();

        if let Some(mapped) = self.type_map.get(full_name) {
            return Ok(mapped.clone());
        }

        if self.use_default_collection_names {
            return Ok(short_type_name(full_name).to_string());
        }

        Err(ConfigError::UnresolvedCollection(full_name.to_string()))
    }
}

/// The last `::`-separated segment of a fully qualified type name.
fn short_type_name(full_name: &str) -> &str {
    full_name.rsplit("::").next().unwrap_or(full_name)
}

/// Generate the default collection name for a queue carrying payload `P`,
/// when no explicit name is supplied.
///
/// `_Queue.<uppercase hex xxh3_64 digest of the fully qualified type
/// name>.<short type name>`, a pure function of `P`: equal payload types
/// always produce equal names.
pub fn default_queue_collection_name<P: 'static>() -> String {
    let full_name = type_name::<P>();
    let digest = xxh3_64(full_name.as_bytes());
    format!(
        "{QUEUE_COLLECTION_PREFIX}.{digest:016X}.{}",
        short_type_name(full_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    struct Gadget;

    #[test]
    fn resolves_from_explicit_map() {
        let mut map = HashMap::new();
        map.insert(type_name::<Widget>().to_string(), "widgets".to_string());
        let resolver = CollectionNameResolver::new(map, false);

        assert_eq!(resolver.resolve::<Widget>().unwrap(), "widgets");
    }

    #[test]
    fn falls_back_to_short_type_name_by_default() {
        let resolver = CollectionNameResolver::new(HashMap::new(), true);
        assert_eq!(resolver.resolve::<Widget>().unwrap(), "Widget");
    }

    #[test]
    fn fails_when_unmapped_and_defaults_disabled() {
        let resolver = CollectionNameResolver::new(HashMap::new(), false);
        let err = resolver.resolve::<Widget>().unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedCollection(_)));
    }

    #[test]
    fn queue_collection_name_is_a_function_of_the_type() {
        let a = default_queue_collection_name::<Widget>();
        let b = default_queue_collection_name::<Widget>();
        assert_eq!(a, b);
        assert!(a.starts_with("_Queue."));
        assert!(a.ends_with("Widget"));
    }

    #[test]
    fn distinct_payload_types_get_distinct_names() {
        assert_ne!(
            default_queue_collection_name::<Widget>(),
            default_queue_collection_name::<Gadget>()
        );
    }
}
