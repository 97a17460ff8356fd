//! # mongofleet-driver
//!
//! Thin MongoDB connection and document wrapper shared by the `mongofleet`
//! coordination crates (`mongofleet-lock`, `mongofleet-migrate`,
//! `mongofleet-queue`).
//!
//! This crate provides:
//! - Connection management via the official MongoDB driver, with pooling
//!   handled by the driver itself.
//! - BSON document helpers (`DocumentExt`, `to_document`/`from_document`).
//! - An injectable [`TimeSource`] so lease and lock-expiry logic never reads
//!   the OS clock directly.
//!
//! It does not implement a query builder, filter DSL, or aggregation
//! pipeline; those belong to a general-purpose ORM driver, not to a
//! coordination library whose collections have a handful of fixed shapes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mongofleet_driver::MongoClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("mydb")
//!         .build()
//!         .await?;
//!
//!     let locks = client.collection_doc("_locks");
//!     println!("{:?}", locks.name());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod time;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder};
pub use document::{DocumentExt, from_document, to_document};
pub use error::{MongoError, MongoResult};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::document::DocumentExt;
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::time::{FixedTimeSource, SystemTimeSource, TimeSource};
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
