//! Error taxonomy for the query engine.
//!
//! Every variant is recoverable: [`QueryEngine::submit`](crate::engine::QueryEngine::submit)
//! turns each one into a failed [`QueryResult`](crate::models::QueryResult)
//! carrying a complete sentence, so callers never need special-case
//! failure rendering.

use thiserror::Error;

use crate::mapping::Role;

/// Failures that can surface while answering a question.
#[derive(Error, Debug)]
pub enum QueryError {
    /// No dataset has been ingested yet.
    #[error("no active dataset: import a file before asking questions")]
    NoActiveDataset,

    /// A dataset was requested by an id no collection has.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// A predicate targeted a role that no header resolves to.
    ///
    /// Only reported when it leaves the query with nothing to filter on.
    #[error("no column found for {0}")]
    UnresolvedField(Role),

    /// The record store could not be read.
    #[error("storage access failed: {0}")]
    StorageAccessFailure(String),

    /// None of the sampled columns holds numeric values.
    #[error("no numeric field found")]
    NoNumericField,

    /// The external language model call failed.
    #[error("external model failed: {0}")]
    ExternalModelFailure(String),
}

impl QueryError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        QueryError::StorageAccessFailure(err.to_string())
    }

    pub fn model(err: impl std::fmt::Display) -> Self {
        QueryError::ExternalModelFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
