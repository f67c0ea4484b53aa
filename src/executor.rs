//! Query execution against the record store.
//!
//! Equality predicates are pushed down to the [`RecordStore`]; contains
//! predicates are evaluated here, case-insensitively, over the fetched set
//! (the store cannot combine substring matching with native ordering).
//! Sort and limit are applied last, after contains-filtering.

use tracing::debug;

use crate::error::{QueryError, Result};
use crate::models::{Operator, Predicate, QueryIntent, Record, SortOrder};
use crate::store::RecordStore;

/// Run an intent's filters, sort and limit against one collection.
pub async fn execute(
    store: &dyn RecordStore,
    collection_id: Option<&str>,
    intent: &QueryIntent,
) -> Result<Vec<Record>> {
    let collection_id = collection_id.ok_or(QueryError::NoActiveDataset)?;

    let (pushed, local): (Vec<Predicate>, Vec<Predicate>) = intent
        .filters
        .iter()
        .cloned()
        .partition(|p| p.operator == Operator::Equals);

    let fetched = store
        .fetch_records(collection_id, &pushed)
        .await
        .map_err(QueryError::storage)?;
    let fetched_len = fetched.len();

    let mut matches: Vec<Record> = fetched
        .into_iter()
        .filter(|r| local.iter().all(|p| p.matches(r)))
        .collect();

    if let Some(order) = intent.sort {
        sort_by_recency(&mut matches, order);
    }
    if let Some(limit) = intent.limit {
        matches.truncate(limit);
    }

    debug!(
        collection_id,
        pushed = pushed.len(),
        local = local.len(),
        fetched = fetched_len,
        matched = matches.len(),
        "executed query"
    );
    Ok(matches)
}

/// Order by ingestion time, row index breaking ties.
pub fn sort_by_recency(records: &mut [Record], order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = a
            .ingested_at
            .cmp(&b.ingested_at)
            .then(a.row_index.cmp(&b.row_index));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}
