//! `QueueDefinition<P>`: the fixed identity of one payload's queue.
//!
//! A queue is identified by its collection name and the fully qualified
//! payload type name it carries. Both the publisher and the subscription
//! are built against the same definition so the type and collection can
//! never drift apart at a single call site.

use std::any::type_name;
use std::marker::PhantomData;

/// Identifies one payload type's queue: its collection and the type name
/// recorded on every item for audit/compat.
#[derive(Debug, Clone)]
pub struct QueueDefinition<P> {
    collection_name: String,
    payload_type_name: String,
    _marker: PhantomData<fn() -> P>,
}

impl<P> QueueDefinition<P> {
    /// Build a definition with an explicit collection name.
    ///
    /// The payload type name defaults to `std::any::type_name::<P>()`; use
    /// [`with_payload_type_name`](Self::with_payload_type_name) to override
    /// it (for example to a stable name independent of Rust's module path).
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            payload_type_name: type_name::<P>().to_string(),
            _marker: PhantomData,
        }
    }

    /// Override the recorded payload type name.
    pub fn with_payload_type_name(mut self, name: impl Into<String>) -> Self {
        self.payload_type_name = name.into();
        self
    }

    /// The collection this queue's items live in.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// The payload type name recorded on every item.
    pub fn payload_type_name(&self) -> &str {
        &self.payload_type_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn payload_type_name_defaults_to_rust_type_name() {
        let def = QueueDefinition::<Widget>::new("_Queue.widgets");
        assert!(def.payload_type_name().contains("Widget"));
    }

    #[test]
    fn payload_type_name_can_be_overridden() {
        let def = QueueDefinition::<Widget>::new("_Queue.widgets")
            .with_payload_type_name("MyApp.Widget");
        assert_eq!(def.payload_type_name(), "MyApp.Widget");
    }
}
