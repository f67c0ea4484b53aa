//! Intent classification.
//!
//! A question is assigned exactly one [`IntentKind`] by walking an ordered
//! rule table and returning the first rule whose phrase appears in the
//! lower-cased text as a whole word or phrase. Specific categories sit
//! ahead of generic ones: "what is the identifier number of ..." must hit
//! `Identifier` before the generic `number of` count rule or the `what`
//! list rule can see it.
//!
//! Unmatched or empty text is [`IntentKind::List`].

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Count,
    Sum,
    Average,
    Max,
    Min,
    Trend,
    Location,
    Date,
    Action,
    Identifier,
    List,
}

impl IntentKind {
    /// Intents answered with a single scalar.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            IntentKind::Count
                | IntentKind::Sum
                | IntentKind::Average
                | IntentKind::Max
                | IntentKind::Min
        )
    }

    /// Intents that ask about a specific record's fields.
    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            IntentKind::Identifier | IntentKind::Location | IntentKind::Date | IntentKind::Action
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Count => "count",
            IntentKind::Sum => "sum",
            IntentKind::Average => "average",
            IntentKind::Max => "max",
            IntentKind::Min => "min",
            IntentKind::Trend => "trend",
            IntentKind::Location => "location",
            IntentKind::Date => "date",
            IntentKind::Action => "action",
            IntentKind::Identifier => "identifier",
            IntentKind::List => "list",
        };
        write!(f, "{}", s)
    }
}

/// Ordered `(intent, phrases)` rule table. Order is significant.
const RULES: &[(IntentKind, &[&str])] = &[
    (
        IntentKind::Count,
        &["how many", "count of", "count the", "count all", "total number of"],
    ),
    (
        IntentKind::Identifier,
        &[
            "identifier",
            "identifiers",
            "id number",
            "notification number",
            "order number",
            "work order number",
            "which id",
            "what id",
        ],
    ),
    (IntentKind::Sum, &["total", "sum of", "sum"]),
    (IntentKind::Average, &["average", "avg", "mean"]),
    (
        IntentKind::Max,
        &["maximum", "max", "highest", "largest", "most expensive"],
    ),
    (
        IntentKind::Min,
        &["minimum", "min", "lowest", "smallest", "cheapest"],
    ),
    (IntentKind::Count, &["number of", "count"]),
    (
        IntentKind::Trend,
        &["trend", "trends", "over time", "per month", "by month", "per year", "by year"],
    ),
    (
        IntentKind::Date,
        &["when", "what date", "which date", "happened on", "on date", "date"],
    ),
    (
        IntentKind::Location,
        &["where", "location", "locations", "address", "which street", "what street"],
    ),
    (
        IntentKind::Action,
        &[
            "what action",
            "what actions",
            "action",
            "actions",
            "what was done",
            "work performed",
            "repaired",
            "replaced",
            "fixed",
        ],
    ),
    (
        IntentKind::List,
        &["what", "show", "list", "give me", "find", "display"],
    ),
];

static COMPILED: LazyLock<Vec<(IntentKind, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|(kind, phrases)| {
            let alternation = phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\b(?:{})\b", alternation))
                .expect("intent rule phrases are escaped literals");
            (*kind, re)
        })
        .collect()
});

/// Classify a raw question. Never fails.
pub fn classify(query: &str) -> IntentKind {
    let lowered = query.to_lowercase();
    COMPILED
        .iter()
        .find(|(_, re)| re.is_match(&lowered))
        .map(|(kind, _)| *kind)
        .unwrap_or(IntentKind::List)
}
