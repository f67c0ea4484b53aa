//! Question answering orchestration.
//!
//! [`QueryEngine::submit`] runs one question through the pipeline:
//!
//! ```text
//! classify → extract → execute → (aggregate) → format
//!                          │
//!                          └─ low confidence ─→ text model over the whole dataset
//! ```
//!
//! The engine owns the active [`DatasetContext`]. It is resolved lazily to
//! the newest collection on the first question, replaced wholesale by
//! [`QueryEngine::use_dataset`] or [`QueryEngine::activate`], and never
//! shared between engines. Every question re-checks the newest collection:
//! a file imported since the context was chosen (by this process or by a
//! separate `rq ingest`) becomes the active dataset, even over an explicit
//! `use_dataset` choice.
//!
//! # Model fallback
//!
//! The rule-based pipeline answers first. The text model is consulted only
//! when a model is configured, `query.fallback = "low-confidence"`, the
//! dataset has records, and one of these holds:
//!
//! - the intent is trend;
//! - a non-aggregate question carries an analytical cue ("most common",
//!   "compare", "why", "breakdown", ...);
//! - a list question produced no filters and no recency modifier;
//! - a list question matched nothing.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::config::{FallbackPolicy, QueryConfig};
use crate::error::QueryError;
use crate::executor::execute;
use crate::extract::{extract, Extraction};
use crate::format::{no_numeric_field, Formatter};
use crate::intent::{classify, IntentKind};
use crate::llm::{build_prompt, TextModel};
use crate::mapping::ColumnMapping;
use crate::models::{AnswerSource, Collection, QueryIntent, QueryResult, Record};
use crate::store::RecordStore;

/// The dataset questions are currently asked against.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    pub collection_id: String,
    pub source_file: String,
    pub record_count: i64,
    pub mapping: ColumnMapping,
}

impl DatasetContext {
    pub fn from_collection(collection: &Collection) -> Self {
        Self {
            collection_id: collection.id.clone(),
            source_file: collection.source_file.clone(),
            record_count: collection.record_count,
            mapping: ColumnMapping::from_headers(&collection.headers),
        }
    }
}

static ANALYTICAL_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(most|least|common|frequent|frequently|compare|comparison|why|summarize|summary|breakdown|pattern|patterns|group by)\b",
    )
    .expect("valid analytical cue pattern")
});

pub struct QueryEngine {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn TextModel>,
    settings: QueryConfig,
    context: Option<DatasetContext>,
    /// Id of the newest collection when the context was last chosen.
    newest_seen: Option<String>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn RecordStore>, model: Arc<dyn TextModel>, settings: QueryConfig) -> Self {
        Self {
            store,
            model,
            settings,
            context: None,
            newest_seen: None,
        }
    }

    pub fn context(&self) -> Option<&DatasetContext> {
        self.context.as_ref()
    }

    /// Make a freshly imported collection the active dataset.
    pub fn activate(&mut self, collection: &Collection) -> &DatasetContext {
        info!(collection_id = %collection.id, source_file = %collection.source_file, "dataset activated");
        self.newest_seen = Some(collection.id.clone());
        self.context.insert(DatasetContext::from_collection(collection))
    }

    /// Switch to an existing collection by id.
    ///
    /// The choice holds until a newer collection is imported.
    pub async fn use_dataset(&mut self, collection_id: &str) -> Result<&DatasetContext, QueryError> {
        let collection = self
            .store
            .get_collection(collection_id)
            .await
            .map_err(QueryError::storage)?
            .ok_or_else(|| QueryError::UnknownDataset(collection_id.to_string()))?;
        let newest = self
            .store
            .latest_collection()
            .await
            .map_err(QueryError::storage)?
            .map(|c| c.id);
        info!(collection_id = %collection.id, source_file = %collection.source_file, "dataset selected");
        self.newest_seen = newest;
        Ok(self.context.insert(DatasetContext::from_collection(&collection)))
    }

    /// The active context. Switches to the newest collection when none is
    /// set or when one was imported since the context was chosen.
    async fn resolve_context(&mut self) -> Result<DatasetContext, QueryError> {
        let latest = self
            .store
            .latest_collection()
            .await
            .map_err(QueryError::storage)?;
        if let Some(latest) = latest {
            if self.newest_seen.as_deref() != Some(latest.id.as_str()) {
                debug!(collection_id = %latest.id, "newest collection changed");
                return Ok(self.activate(&latest).clone());
            }
        }
        self.context.clone().ok_or(QueryError::NoActiveDataset)
    }

    /// Answer one question. Never fails: errors come back as an
    /// unsuccessful [`QueryResult`] whose answer explains what went wrong.
    pub async fn submit(&mut self, text: &str) -> QueryResult {
        let kind = classify(text);

        let ctx = match self.resolve_context().await {
            Ok(ctx) => ctx,
            Err(e) => return fail(QueryIntent::bare(kind), e),
        };

        let extraction = extract(text, kind, &ctx.mapping);
        let intent = QueryIntent {
            kind,
            filters: extraction.filters.clone(),
            sort: extraction.sort,
            limit: extraction.limit,
        };

        if intent.filters.is_empty() {
            if let Some(role) = extraction.unresolved.first() {
                return fail(intent, QueryError::UnresolvedField(*role));
            }
        }

        let matches = match execute(self.store.as_ref(), Some(&ctx.collection_id), &intent).await {
            Ok(m) => m,
            Err(e) => return fail(intent, e),
        };

        if self.wants_model(text, &intent, &extraction, matches.len(), &ctx) {
            return self.ask_model(text, intent, matches, &ctx).await;
        }

        self.answer(text, intent, matches, &ctx)
    }

    fn answer(
        &self,
        text: &str,
        intent: QueryIntent,
        matches: Vec<Record>,
        ctx: &DatasetContext,
    ) -> QueryResult {
        let formatter = Formatter::new(&ctx.mapping, self.settings.summary_values);

        let mut scalar = None;
        let mut agg = None;
        if intent.kind.is_aggregate() && !matches.is_empty() {
            match aggregate(
                intent.kind,
                &matches,
                &ctx.mapping,
                &text.to_lowercase(),
                self.settings.numeric_sample,
            ) {
                Ok(a) => {
                    scalar = Some(a.value);
                    agg = Some(a);
                }
                Err(QueryError::NoNumericField) => {
                    return QueryResult {
                        success: false,
                        matches,
                        scalar: None,
                        answer: no_numeric_field(intent.kind),
                        intent,
                        answered_by: AnswerSource::Pipeline,
                    };
                }
                Err(e) => return fail(intent, e),
            }
        } else if intent.kind == IntentKind::Count {
            scalar = Some(0.0);
        }

        let answer = formatter.answer(&intent, &matches, agg.as_ref());
        info!(intent = %intent.kind, matches = matches.len(), "answered by pipeline");
        QueryResult {
            success: true,
            matches,
            scalar,
            answer,
            intent,
            answered_by: AnswerSource::Pipeline,
        }
    }

    fn wants_model(
        &self,
        text: &str,
        intent: &QueryIntent,
        extraction: &Extraction,
        matched: usize,
        ctx: &DatasetContext,
    ) -> bool {
        if !self.model.enabled()
            || self.settings.fallback == FallbackPolicy::Never
            || ctx.record_count <= 0
        {
            return false;
        }

        let lowered = text.to_lowercase().replace("most recent", " ");
        let reason = if intent.kind == IntentKind::Trend {
            Some("trend")
        } else if !intent.kind.is_aggregate() && ANALYTICAL_CUE.is_match(&lowered) {
            Some("analytical cue")
        } else if intent.kind == IntentKind::List
            && extraction.filters.is_empty()
            && extraction.sort.is_none()
        {
            Some("no filters")
        } else if intent.kind == IntentKind::List && matched == 0 {
            Some("no matches")
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(reason, model = %self.model.name(), "delegating to text model");
        }
        reason.is_some()
    }

    async fn ask_model(
        &self,
        text: &str,
        intent: QueryIntent,
        matches: Vec<Record>,
        ctx: &DatasetContext,
    ) -> QueryResult {
        let everything = match self.store.fetch_records(&ctx.collection_id, &[]).await {
            Ok(records) => records,
            Err(e) => return fail(intent, QueryError::storage(e)),
        };
        let prompt = build_prompt(text, ctx.mapping.headers(), &everything);

        match self.model.complete(&prompt).await {
            Ok(answer) => {
                info!(intent = %intent.kind, records = everything.len(), "answered by text model");
                QueryResult {
                    success: true,
                    matches,
                    scalar: None,
                    answer,
                    intent,
                    answered_by: AnswerSource::Model,
                }
            }
            Err(e) => {
                warn!(error = %e, "text model call failed");
                fail(intent, QueryError::model(e))
            }
        }
    }
}

fn fail(intent: QueryIntent, err: QueryError) -> QueryResult {
    debug!(error = %err, "query failed");
    let message = match &err {
        QueryError::NoActiveDataset => {
            "There is no active dataset yet. Import a file before asking questions.".to_string()
        }
        QueryError::UnresolvedField(role) => format!(
            "I couldn't apply your filter: the active dataset has no {} column.",
            role
        ),
        other => format!("Sorry, I couldn't answer that: {}.", other),
    };
    QueryResult::failure(intent, message)
}
