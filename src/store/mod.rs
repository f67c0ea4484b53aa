//! Storage abstraction for imported records.
//!
//! The [`RecordStore`] trait is everything the query engine and the
//! ingestion loader need from persistence, so the engine can run against
//! SQLite ([`SqliteStore`](crate::sqlite_store::SqliteStore)) or the
//! [`memory::InMemoryStore`] used in tests.
//!
//! Only equality predicates are ever handed to a store. Substring matching
//! happens in the [`executor`](crate::executor) after the fetch.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Collection, Predicate, Record};

/// Abstract storage backend for collections and their records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_collection`](RecordStore::insert_collection) | Store a collection and all its rows |
/// | [`get_collection`](RecordStore::get_collection) | Look up one collection |
/// | [`latest_collection`](RecordStore::latest_collection) | Most recently created collection |
/// | [`find_collection_by_hash`](RecordStore::find_collection_by_hash) | Detect a re-imported file |
/// | [`list_collections`](RecordStore::list_collections) | All collections, newest first |
/// | [`fetch_records`](RecordStore::fetch_records) | Rows matching equality predicates |
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a collection together with its records.
    async fn insert_collection(&self, collection: &Collection, records: &[Record]) -> Result<()>;

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>>;

    /// The most recently created collection, if any.
    async fn latest_collection(&self) -> Result<Option<Collection>>;

    async fn find_collection_by_hash(&self, content_hash: &str) -> Result<Option<Collection>>;

    /// All collections, newest first.
    async fn list_collections(&self) -> Result<Vec<Collection>>;

    /// Records of a collection satisfying every equality predicate, in row order.
    ///
    /// Predicates with any other operator are ignored.
    async fn fetch_records(&self, collection_id: &str, filters: &[Predicate]) -> Result<Vec<Record>>;
}
