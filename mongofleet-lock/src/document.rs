//! The `LockDocument` persisted shape.
//!
//! One document per lock name, carrying the explicit `holder`/
//! `lease_until_utc` pair the acquisition algorithm in `manager.rs` depends
//! on.

use bson::DateTime as BsonDateTime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The document stored per lock name in the lock collection.
///
/// A document exists iff some holder believes it owns the lock; `holder` is
/// only meaningful while `now < lease_until_utc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDocument {
    /// The lock name; the collection's primary key.
    #[serde(rename = "_id")]
    pub id: String,
    /// Opaque identifier of the owning process.
    pub holder: String,
    /// Wall-clock moment past which the lock is considered abandoned.
    #[serde(rename = "leaseUntilUtc")]
    pub lease_until_utc: BsonDateTime,
}

impl LockDocument {
    /// The lease expiry as a `chrono::DateTime<Utc>`.
    pub fn lease_until(&self) -> DateTime<Utc> {
        self.lease_until_utc.to_chrono()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bson() {
        let doc = LockDocument {
            id: "migrations".to_string(),
            holder: "proc-1".to_string(),
            lease_until_utc: BsonDateTime::from_chrono(Utc::now()),
        };

        let bson_doc = bson::to_document(&doc).unwrap();
        let back: LockDocument = bson::from_document(bson_doc).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn wire_field_is_camel_case_lease_until_utc() {
        // `manager.rs` reads and writes this field through raw `doc!{}`
        // literals keyed "leaseUntilUtc", not through this struct, so the
        // two must agree on the wire name.
        let doc = LockDocument {
            id: "migrations".to_string(),
            holder: "proc-1".to_string(),
            lease_until_utc: BsonDateTime::from_chrono(Utc::now()),
        };
        let bson_doc = bson::to_document(&doc).unwrap();
        assert!(bson_doc.contains_key("leaseUntilUtc"));
        assert!(!bson_doc.contains_key("lease_until_utc"));
    }
}
