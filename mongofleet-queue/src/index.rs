//! Partial compound index maintenance for the "find next runnable item"
//! query.
//!
//! On subscription start, ensure a partial index on `(is_closed, is_locked)`
//! restricted to `is_closed == false AND is_locked == false`, so the index
//! only ever covers rows a processor would actually scan. If an index by
//! this name already exists with a different key or option spec, it's
//! dropped and recreated rather than left stale.

use bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use mongofleet_driver::{Document, MongoError, MongoResult};
use tracing::{debug, info};

/// Name of the partial index this module maintains.
pub const RUNNABLE_INDEX_NAME: &str = "mongofleet_runnable";

/// Create or reconcile the runnable-item partial index on `collection`.
pub async fn ensure_runnable_index(collection: &Collection<Document>) -> MongoResult<()> {
    let keys = doc! { "isClosed": 1, "isLocked": 1 };
    let partial_filter = doc! { "isClosed": false, "isLocked": false };

    let options = IndexOptions::builder()
        .name(RUNNABLE_INDEX_NAME.to_string())
        .partial_filter_expression(partial_filter)
        .build();
    let model = IndexModel::builder().keys(keys).options(options).build();

    match collection.create_index(model, None).await {
        Ok(_) => {
            debug!(collection = %collection.name(), "runnable index present");
            Ok(())
        }
        Err(err) => {
            // A conflicting index (same name, different keys/options, or
            // vice versa) surfaces as code 85 (IndexOptionsConflict) or 86
            // (IndexKeySpecsConflict). Drop and recreate rather than fail
            // startup over an index that just needs reconciling.
            if is_index_conflict(&err) {
                info!(collection = %collection.name(), "reconciling conflicting runnable index");
                collection
                    .drop_index(RUNNABLE_INDEX_NAME, None)
                    .await
                    .map_err(MongoError::from)?;

                let keys = doc! { "isClosed": 1, "isLocked": 1 };
                let partial_filter = doc! { "isClosed": false, "isLocked": false };
                let options = IndexOptions::builder()
                    .name(RUNNABLE_INDEX_NAME.to_string())
                    .partial_filter_expression(partial_filter)
                    .build();
                let model = IndexModel::builder().keys(keys).options(options).build();
                collection
                    .create_index(model, None)
                    .await
                    .map_err(MongoError::from)?;
                Ok(())
            } else {
                Err(MongoError::from(err))
            }
        }
    }
}

fn is_index_conflict(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Command(command_error) if command_error.code == 85 || command_error.code == 86
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_is_stable() {
        assert_eq!(RUNNABLE_INDEX_NAME, "mongofleet_runnable");
    }
}
