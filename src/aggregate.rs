//! Scalar aggregation over a match set.
//!
//! Count needs no field. Sum, average, max and min run over one numeric
//! column picked automatically: a column the question names literally
//! wins, otherwise the first column (in header order) whose sampled values
//! all parse as numbers. Identifier, sequence and date columns are never
//! candidates since they are numeric-looking labels, not measurements.
//!
//! Average and min skip zero and empty cells; zero means "not recorded".

use tracing::debug;

use crate::error::{QueryError, Result};
use crate::intent::IntentKind;
use crate::mapping::{ColumnMapping, Role};
use crate::models::Record;

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Column the value was computed over; `None` for count.
    pub field: Option<String>,
    pub value: f64,
    /// Number of values that went into the result.
    pub counted: usize,
}

const LABEL_ROLES: [Role; 3] = [Role::Identifier, Role::Sequence, Role::Date];

/// Compute the aggregate an intent asks for.
///
/// `query` is the lower-cased question, used to honour a column named in
/// it. Non-aggregate intents are treated as count.
pub fn aggregate(
    kind: IntentKind,
    records: &[Record],
    mapping: &ColumnMapping,
    query: &str,
    sample_size: usize,
) -> Result<Aggregate> {
    if !matches!(
        kind,
        IntentKind::Sum | IntentKind::Average | IntentKind::Max | IntentKind::Min
    ) {
        return Ok(Aggregate {
            field: None,
            value: records.len() as f64,
            counted: records.len(),
        });
    }

    let field = detect_numeric_field(records, mapping, query, sample_size)
        .ok_or(QueryError::NoNumericField)?;

    let skip_zero = matches!(kind, IntentKind::Average | IntentKind::Min);
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.get(&field).and_then(|v| v.as_f64()))
        .filter(|v| !(skip_zero && *v == 0.0))
        .collect();

    let value = match kind {
        IntentKind::Sum => values.iter().sum(),
        IntentKind::Average if values.is_empty() => 0.0,
        IntentKind::Average => values.iter().sum::<f64>() / values.len() as f64,
        IntentKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => values.iter().copied().fold(f64::INFINITY, f64::min),
    };
    let value = if value.is_finite() { value } else { 0.0 };

    debug!(%kind, field = %field, counted = values.len(), value, "aggregated");
    Ok(Aggregate {
        field: Some(field),
        value,
        counted: values.len(),
    })
}

/// Pick the numeric column to aggregate over.
pub fn detect_numeric_field(
    records: &[Record],
    mapping: &ColumnMapping,
    query: &str,
    sample_size: usize,
) -> Option<String> {
    let sample = &records[..records.len().min(sample_size.max(1))];
    let candidates: Vec<&String> = mapping
        .headers()
        .iter()
        .filter(|h| {
            mapping
                .role_of(h)
                .map(|r| !LABEL_ROLES.contains(&r))
                .unwrap_or(true)
        })
        .filter(|h| is_numeric_column(sample, h))
        .collect();

    candidates
        .iter()
        .find(|h| mentions(query, h))
        .or_else(|| candidates.first())
        .map(|h| h.to_string())
}

fn is_numeric_column(sample: &[Record], header: &str) -> bool {
    let mut seen = 0;
    for record in sample {
        match record.get(header) {
            Some(v) if v.is_empty() => {}
            Some(v) => {
                if v.as_f64().is_none() {
                    return false;
                }
                seen += 1;
            }
            None => {}
        }
    }
    seen > 0
}

fn mentions(query: &str, header: &str) -> bool {
    let header = header.to_lowercase();
    !header.is_empty()
        && query
            .match_indices(&header)
            .any(|(i, _)| {
                let before = query[..i].chars().next_back();
                let after = query[i + header.len()..].chars().next();
                !before.is_some_and(|c| c.is_alphanumeric())
                    && !after.is_some_and(|c| c.is_alphanumeric())
            })
}
