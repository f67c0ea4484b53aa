//! Core data models used throughout record-query.
//!
//! These types represent the imported records, the structured query built
//! from a question, and the result handed back to the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::intent::IntentKind;

/// A single cell value from an imported row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Parse a raw cell.
    ///
    /// A cell becomes a number only when the number renders back to exactly
    /// the same text, so every value displays as it was imported. `"3.50"`,
    /// `"+7"`, `"1e3"`, `"007"` and integers beyond `f64` precision stay
    /// text; [`as_f64`](Self::as_f64) still reads them for aggregation.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() && n.to_string() == trimmed {
                return FieldValue::Number(n);
            }
        }
        FieldValue::Text(trimmed.to_string())
    }

    /// Numeric interpretation of the value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.2}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// One imported row, keyed by the original column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub collection_id: String,
    pub source_file: String,
    /// Unix seconds.
    pub ingested_at: i64,
    /// 0-based position of the row in the source file.
    pub row_index: i64,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn get(&self, header: &str) -> Option<&FieldValue> {
        self.fields.get(header)
    }

    /// Non-empty display text of a field.
    pub fn text(&self, header: &str) -> Option<String> {
        self.get(header)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }
}

/// An imported dataset: one source file, one set of headers.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: String,
    pub source_file: String,
    /// Headers in source order.
    pub headers: Vec<String>,
    pub created_at: i64,
    pub record_count: i64,
    pub content_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Equals => write!(f, "equals"),
            Operator::Contains => write!(f, "contains"),
        }
    }
}

/// A single filter condition.
///
/// `fields` lists the headers the value is tested against; the predicate
/// holds when any of them satisfies the operator. Role predicates carry a
/// single header, keyword predicates may carry several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub fields: Vec<String>,
    pub operator: Operator,
    pub value: String,
}

impl Predicate {
    pub fn equals(field: &str, value: impl Into<String>) -> Self {
        Self {
            fields: vec![field.to_string()],
            operator: Operator::Equals,
            value: value.into(),
        }
    }

    pub fn contains(fields: Vec<String>, value: impl Into<String>) -> Self {
        Self {
            fields,
            operator: Operator::Contains,
            value: value.into(),
        }
    }

    /// Evaluate against a record. Contains is case-insensitive, equals is exact.
    pub fn matches(&self, record: &Record) -> bool {
        let needle = self.value.to_lowercase();
        let typed = FieldValue::from_raw(&self.value);
        self.fields.iter().any(|field| match record.get(field) {
            Some(v) => match self.operator {
                Operator::Equals => *v == typed || v.to_string() == self.value,
                Operator::Contains => v.to_string().to_lowercase().contains(&needle),
            },
            None => false,
        })
    }

    /// Short human-readable form, e.g. `Location contains "MAIN STREET"`.
    pub fn describe(&self) -> String {
        format!(
            "{} {} \"{}\"",
            self.fields.join(" or "),
            self.operator,
            self.value
        )
    }
}

/// Ordering by ingestion time (row index breaks ties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// The structured form of a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryIntent {
    pub kind: IntentKind,
    pub filters: Vec<Predicate>,
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
}

impl QueryIntent {
    pub fn bare(kind: IntentKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            sort: None,
            limit: None,
        }
    }
}

/// Which strategy produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Pipeline,
    Model,
}

/// The outcome of one `submit` call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub matches: Vec<Record>,
    pub scalar: Option<f64>,
    pub answer: String,
    pub intent: QueryIntent,
    pub answered_by: AnswerSource,
}

impl QueryResult {
    pub fn failure(intent: QueryIntent, message: impl Into<String>) -> Self {
        Self {
            success: false,
            matches: Vec::new(),
            scalar: None,
            answer: message.into(),
            intent,
            answered_by: AnswerSource::Pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        Record {
            id: "r1".to_string(),
            collection_id: "c1".to_string(),
            source_file: "orders.csv".to_string(),
            ingested_at: 0,
            row_index: 0,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), FieldValue::from_raw(v)))
                .collect(),
        }
    }

    #[test]
    fn test_from_raw_number_and_text() {
        assert_eq!(FieldValue::from_raw("42"), FieldValue::Number(42.0));
        assert_eq!(FieldValue::from_raw(" 3.5 "), FieldValue::Number(3.5));
        assert_eq!(
            FieldValue::from_raw("REPLACE BELT"),
            FieldValue::Text("REPLACE BELT".to_string())
        );
        assert_eq!(
            FieldValue::from_raw("2025-06-24"),
            FieldValue::Text("2025-06-24".to_string())
        );
    }

    #[test]
    fn test_leading_zero_stays_text() {
        assert_eq!(
            FieldValue::from_raw("007"),
            FieldValue::Text("007".to_string())
        );
        assert_eq!(FieldValue::from_raw("0.5"), FieldValue::Number(0.5));
    }

    #[test]
    fn test_large_identifier_displays_verbatim() {
        let v = FieldValue::from_raw("1234567890");
        assert_eq!(v.to_string(), "1234567890");
    }

    #[test]
    fn test_cells_display_as_imported() {
        for raw in ["12.345", "1e3", "+7", "123456789012345678", "3.50", "1,200", "-0.25"] {
            assert_eq!(FieldValue::from_raw(raw).to_string(), raw);
        }
        assert_eq!(FieldValue::from_raw("12.345"), FieldValue::Number(12.345));
        assert_eq!(FieldValue::from_raw("3.50").as_f64(), Some(3.5));
        assert_eq!(FieldValue::from_raw("1e3").as_f64(), Some(1000.0));
        assert_eq!(FieldValue::from_raw("1,200").as_f64(), Some(1200.0));
    }

    #[test]
    fn test_cell_survives_json_round_trip() {
        let r = record(&[("Hours", "12.345"), ("Ref", "123456789012345678")]);
        let json = serde_json::to_string(&r.fields).unwrap();
        let back: BTreeMap<String, FieldValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back["Hours"].to_string(), "12.345");
        assert_eq!(back["Ref"].to_string(), "123456789012345678");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let r = record(&[("Location", "100 MAIN STREET")]);
        let p = Predicate::contains(vec!["Location".to_string()], "main street");
        assert!(p.matches(&r));
    }

    #[test]
    fn test_contains_any_field() {
        let r = record(&[("Action", "REPLACE BELT"), ("Description", "worn belt")]);
        let p = Predicate::contains(
            vec!["Action".to_string(), "Description".to_string()],
            "worn",
        );
        assert!(p.matches(&r));
    }

    #[test]
    fn test_equals_is_exact() {
        let r = record(&[("Date", "2025-06-24")]);
        assert!(Predicate::equals("Date", "2025-06-24").matches(&r));
        assert!(!Predicate::equals("Date", "2025-06-2").matches(&r));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let r = record(&[("Date", "2025-06-24")]);
        assert!(!Predicate::equals("Location", "x").matches(&r));
    }

    #[test]
    fn test_describe() {
        let p = Predicate::contains(vec!["Location".to_string()], "MAIN STREET");
        assert_eq!(p.describe(), "Location contains \"MAIN STREET\"");
    }
}
