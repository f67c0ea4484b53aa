//! In-memory [`RecordStore`] implementation for tests and embedding.
//!
//! Uses `Vec`s behind `std::sync::RwLock` for thread safety. Equality
//! predicates are evaluated with [`Predicate::matches`], the same rule the
//! SQLite store expresses in SQL.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Collection, Operator, Predicate, Record};

use super::RecordStore;

/// In-memory store for testing.
pub struct InMemoryStore {
    collections: RwLock<Vec<Collection>>,
    records: RwLock<Vec<Record>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert_collection(&self, collection: &Collection, records: &[Record]) -> Result<()> {
        self.collections
            .write()
            .map_err(poisoned)?
            .push(collection.clone());
        self.records
            .write()
            .map_err(poisoned)?
            .extend(records.iter().cloned());
        Ok(())
    }

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.iter().find(|c| c.id == id).cloned())
    }

    async fn latest_collection(&self) -> Result<Option<Collection>> {
        let collections = self.collections.read().map_err(poisoned)?;
        // max_by_key keeps the last of equal keys, i.e. the later insert.
        Ok(collections.iter().max_by_key(|c| c.created_at).cloned())
    }

    async fn find_collection_by_hash(&self, content_hash: &str) -> Result<Option<Collection>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .iter()
            .find(|c| c.content_hash == content_hash)
            .cloned())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut out: Vec<Collection> = collections.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn fetch_records(&self, collection_id: &str, filters: &[Predicate]) -> Result<Vec<Record>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut out: Vec<Record> = records
            .iter()
            .filter(|r| r.collection_id == collection_id)
            .filter(|r| {
                filters
                    .iter()
                    .filter(|p| p.operator == Operator::Equals)
                    .all(|p| p.matches(r))
            })
            .cloned()
            .collect();
        out.sort_by_key(|r| r.row_index);
        Ok(out)
    }
}
