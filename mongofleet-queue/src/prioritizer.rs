//! Ordering of candidate items within a processor batch.
//!
//! The default prioritizer sorts ascending by `_id`, which for `ObjectId`s
//! is creation order. A custom prioritizer can reorder the batch (e.g. a
//! priority field) without touching the claim or signal logic.

use bson::doc;
use bson::Document;

/// Produces the sort document the processor applies to the candidate query.
pub trait Prioritizer: Send + Sync {
    /// The MongoDB sort specification for the "find next runnable items"
    /// query.
    fn sort(&self) -> Document;
}

/// Ascending by `_id`, first published, first processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatedOrderPrioritizer;

impl Prioritizer for CreatedOrderPrioritizer {
    fn sort(&self) -> Document {
        doc! { "_id": 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prioritizer_sorts_ascending_by_id() {
        let prioritizer = CreatedOrderPrioritizer;
        assert_eq!(prioritizer.sort(), doc! { "_id": 1 });
    }
}
