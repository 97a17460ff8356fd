//! The `QueueItem<P>` persisted shape and its state machine.
//!
//! `(is_closed, is_locked)` only ever moves `(F,F) -> (F,T) -> (T,F)`, and
//! a closed item is never reopened by this crate. One collection exists
//! per payload type `P`.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of work persisted in a payload's queue collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem<P> {
    /// Opaque identifier assigned at publish time.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// When the item was published.
    pub created_utc: bson::DateTime,
    /// The work payload.
    pub payload: P,
    /// Fully qualified payload type name, stored for audit/compat.
    pub payload_type: String,
    /// True once the handler has completed successfully.
    #[serde(default)]
    pub is_closed: bool,
    /// True while a processor holds exclusive claim on this item.
    #[serde(default)]
    pub is_locked: bool,
    /// Set when `is_locked` transitions to true; present iff `is_locked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_utc: Option<bson::DateTime>,
    /// Set when `is_closed` transitions to true; present iff `is_closed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_utc: Option<bson::DateTime>,
}

impl<P> QueueItem<P> {
    /// Construct a fresh, unlocked, unclosed item ready to publish.
    pub fn new(payload: P, payload_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            created_utc: bson::DateTime::from_chrono(now),
            payload,
            payload_type: payload_type.into(),
            is_closed: false,
            is_locked: false,
            locked_utc: None,
            closed_utc: None,
        }
    }

    /// `created_utc` as a `chrono::DateTime<Utc>`.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_utc.to_chrono()
    }
}

/// Identifier-only projection used when scanning for candidate items.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueItemId {
    /// The item's id.
    #[serde(rename = "_id")]
    pub id: ObjectId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct TestPayload {
        value: String,
    }

    #[test]
    fn new_item_starts_unlocked_and_unclosed() {
        let item = QueueItem::new(
            TestPayload { value: "m1".to_string() },
            "TestPayload",
            Utc::now(),
        );
        assert!(!item.is_closed);
        assert!(!item.is_locked);
        assert!(item.locked_utc.is_none());
        assert!(item.closed_utc.is_none());
    }

    #[test]
    fn round_trips_through_bson() {
        let item = QueueItem::new(
            TestPayload { value: "m2".to_string() },
            "TestPayload",
            Utc::now(),
        );

        let doc = bson::to_document(&item).unwrap();
        let back: QueueItem<TestPayload> = bson::from_document(doc).unwrap();
        assert_eq!(item, back);
    }

    #[test]
    fn locked_fields_absent_until_set() {
        let item = QueueItem::new(
            TestPayload { value: "m3".to_string() },
            "TestPayload",
            Utc::now(),
        );
        let doc = bson::to_document(&item).unwrap();
        assert!(!doc.contains_key("lockedUtc"));
        assert!(!doc.contains_key("closedUtc"));
    }
}
