//! Migration history: insert-only records of completed migrations.
//!
//! No rollback or checksum fields: migrations here are apply-only and
//! code-defined, so there's nothing to diff against or roll back to.

use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::{ClientSession, Collection};
use mongofleet_driver::{Document, MongoClient, MongoError};
use serde::{Deserialize, Serialize};

use crate::error::MigrateResult;

/// A record that a migration has fully applied.
///
/// Insert-only: the core never updates or removes a row once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationHistoryItem {
    /// The migration's id, matching [`crate::migration::Migration::id`].
    #[serde(rename = "_id")]
    pub id: String,
    /// When the migration finished applying.
    pub applied_utc: bson::DateTime,
    /// How long `apply` took to run, in milliseconds.
    pub duration_ms: i64,
    /// The migration's description, if it supplied one.
    pub description: Option<String>,
}

impl MigrationHistoryItem {
    /// The applied timestamp as a `chrono::DateTime<Utc>`.
    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_utc.to_chrono()
    }
}

/// Thin wrapper over the history collection.
#[derive(Clone)]
pub struct HistoryStore {
    collection: Collection<Document>,
}

impl HistoryStore {
    /// Bind to `collection_name` in `client`'s database.
    pub fn new(client: &MongoClient, collection_name: &str) -> Self {
        Self {
            collection: client.collection_doc(collection_name),
        }
    }

    /// Project and return the ids of every migration ever recorded.
    pub async fn applied_ids(&self) -> MigrateResult<std::collections::HashSet<String>> {
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let mut cursor = self
            .collection
            .find(doc! {}, options)
            .await
            .map_err(MongoError::from)?;

        let mut ids = std::collections::HashSet::new();
        while let Some(doc) = cursor.try_next().await.map_err(MongoError::from)? {
            if let Ok(id) = doc.get_str("_id") {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Insert a completed migration's history row, optionally through a
    /// transaction session.
    pub async fn record(
        &self,
        item: &MigrationHistoryItem,
        session: Option<&mut ClientSession>,
    ) -> MigrateResult<()> {
        let doc = bson::to_document(item).map_err(MongoError::from)?;
        match session {
            Some(session) => {
                self.collection
                    .insert_one_with_session(doc, None, session)
                    .await
                    .map_err(MongoError::from)?;
            }
            None => {
                self.collection
                    .insert_one(doc, None)
                    .await
                    .map_err(MongoError::from)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_at_converts_through_chrono() {
        let now = Utc::now();
        let item = MigrationHistoryItem {
            id: "001_init".to_string(),
            applied_utc: bson::DateTime::from_chrono(now),
            duration_ms: 12,
            description: Some("initial schema".to_string()),
        };

        // BSON datetimes are millisecond-precision; compare at that granularity.
        assert_eq!(item.applied_at().timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn round_trips_through_bson() {
        let item = MigrationHistoryItem {
            id: "002_add_index".to_string(),
            applied_utc: bson::DateTime::from_chrono(Utc::now()),
            duration_ms: 5,
            description: None,
        };

        let doc = bson::to_document(&item).unwrap();
        let back: MigrationHistoryItem = bson::from_document(doc).unwrap();
        assert_eq!(item, back);
    }
}
