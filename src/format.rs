//! Natural-language answer synthesis.
//!
//! Branches on intent and on how many records matched:
//!
//! | Intent | 0 | 1 | many |
//! |--------|---|---|------|
//! | count / sum / average / max / min | lead + `No Results` | scalar sentence | scalar sentence |
//! | identifier / location / date / action | lead + `No Results` | key fields verbatim | narrow, else distinct values |
//! | list / trend | lead + `No Results` | distinct actions and locations | same |
//!
//! Every branch returns a complete sentence; formatting never fails. A
//! zero-match answer only echoes the filters taken from the question, never
//! field values from stored records.

use crate::aggregate::Aggregate;
use crate::intent::IntentKind;
use crate::mapping::{ColumnMapping, Role};
use crate::models::{format_number, Operator, QueryIntent, Record};

/// Heading of the zero-match diagnostic block.
pub const NO_RESULTS: &str = "No Results";

const GENERIC_HINT: &str = "Check the spelling or try a different word.";

pub struct Formatter<'a> {
    mapping: &'a ColumnMapping,
    /// Distinct values listed before collapsing the rest into "and N more".
    summary_values: usize,
}

impl<'a> Formatter<'a> {
    pub fn new(mapping: &'a ColumnMapping, summary_values: usize) -> Self {
        Self {
            mapping,
            summary_values: summary_values.max(1),
        }
    }

    /// Build the answer for a finished query.
    ///
    /// `aggregate` is the scalar for aggregate intents; it is ignored for
    /// the others.
    pub fn answer(
        &self,
        intent: &QueryIntent,
        matches: &[Record],
        aggregate: Option<&Aggregate>,
    ) -> String {
        if matches.is_empty() {
            return format!("{}\n\n{}", zero_lead(intent), self.no_results_block(intent));
        }
        match intent.kind {
            IntentKind::Count => count_sentence(matches.len(), intent),
            IntentKind::Sum | IntentKind::Average | IntentKind::Max | IntentKind::Min => {
                match aggregate {
                    Some(agg) => aggregate_sentence(intent.kind, agg, matches.len()),
                    None => no_numeric_field(intent.kind),
                }
            }
            IntentKind::Identifier
            | IntentKind::Location
            | IntentKind::Date
            | IntentKind::Action => self.entity(intent, matches),
            IntentKind::List | IntentKind::Trend => self.summary(matches),
        }
    }

    // ============ Entity intents ============

    fn entity(&self, intent: &QueryIntent, matches: &[Record]) -> String {
        if let [only] = matches {
            return self.single(intent.kind, only);
        }

        let narrowed = narrow(intent, matches);
        match narrowed.as_slice() {
            [only] => self.single(intent.kind, only),
            [] => self.several(intent.kind, matches.iter()),
            some => self.several(intent.kind, some.iter().copied()),
        }
    }

    fn single(&self, kind: IntentKind, record: &Record) -> String {
        let id = self.value(record, Role::Identifier);
        let location = self.value(record, Role::Location);
        match kind {
            IntentKind::Identifier => match (id, location) {
                (Some(id), Some(loc)) => format!("The identifier for {} is {}.", loc, id),
                (Some(id), None) => format!("The identifier is {}.", id),
                (None, Some(loc)) => format!(
                    "I found one matching record at {}, but it has no identifier recorded.",
                    loc
                ),
                (None, None) => {
                    "I found one matching record, but it has no identifier recorded.".to_string()
                }
            },
            IntentKind::Location => match (id, location) {
                (Some(id), Some(loc)) => format!("{} is located at {}.", id, loc),
                (None, Some(loc)) => format!("The matching record is located at {}.", loc),
                _ => "I found one matching record, but it has no location recorded.".to_string(),
            },
            IntentKind::Date => {
                let date = self
                    .value(record, Role::Date)
                    .unwrap_or_else(|| "an unrecorded date".to_string());
                format!(
                    "On {} the following work was recorded{}: {}.",
                    date,
                    at(location.as_deref()),
                    self.work(record)
                )
            }
            _ => format!(
                "The action taken{} was {}.",
                at(location.as_deref()),
                self.work(record)
            ),
        }
    }

    fn several<'r>(&self, kind: IntentKind, records: impl Iterator<Item = &'r Record>) -> String {
        let records: Vec<&Record> = records.collect();
        let (role, label) = match kind {
            IntentKind::Identifier => (Role::Identifier, "Identifiers"),
            IntentKind::Location => (Role::Location, "Locations"),
            IntentKind::Date => (Role::Date, "Dates"),
            _ => (Role::Action, "Actions"),
        };
        let lead = format!("I found {} matching records.", records.len());
        let values = self.distinct(records.iter().copied(), role);
        if values.is_empty() {
            lead
        } else {
            format!("{} {}: {}.", lead, label, self.truncate(&values))
        }
    }

    // ============ List / trend ============

    fn summary(&self, matches: &[Record]) -> String {
        let mut out = format!(
            "I found {} {}.",
            matches.len(),
            plural(matches.len(), "record", "records")
        );
        let actions = self.distinct(matches.iter(), Role::Action);
        if !actions.is_empty() {
            out.push_str(&format!(" Actions include {}.", self.truncate(&actions)));
        }
        let locations = self.distinct(matches.iter(), Role::Location);
        if !locations.is_empty() {
            out.push_str(&format!(" Locations include {}.", self.truncate(&locations)));
        }
        out
    }

    // ============ Helpers ============

    fn value(&self, record: &Record, role: Role) -> Option<String> {
        self.mapping.resolve(role).and_then(|h| record.text(h))
    }

    /// Action and description of one record, e.g. `REPLACE BELT (worn belt)`.
    fn work(&self, record: &Record) -> String {
        match (
            self.value(record, Role::Action),
            self.value(record, Role::Description),
        ) {
            (Some(a), Some(d)) => format!("{} ({})", a, d),
            (Some(a), None) => a,
            (None, Some(d)) => d,
            (None, None) => "no action or description recorded".to_string(),
        }
    }

    /// Distinct non-empty values of a role, first-seen order.
    fn distinct<'r>(&self, records: impl Iterator<Item = &'r Record>, role: Role) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for record in records {
            if let Some(v) = self.value(record, role) {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        out
    }

    /// `A, B and C` or `A, B, C and 4 more`.
    fn truncate(&self, values: &[String]) -> String {
        if values.len() > self.summary_values {
            let shown = &values[..self.summary_values];
            format!(
                "{} and {} more",
                shown.join(", "),
                values.len() - self.summary_values
            )
        } else {
            join_and(values)
        }
    }

    // ============ No results ============

    /// Diagnostic listing the applied filters and what to try next.
    pub fn no_results_block(&self, intent: &QueryIntent) -> String {
        let mut out = format!("{}\nFilters applied:\n", NO_RESULTS);
        if intent.filters.is_empty() {
            out.push_str("- (none)\n");
        } else {
            for p in &intent.filters {
                out.push_str(&format!("- {}\n", p.describe()));
            }
        }
        out.push_str("Suggestions:\n");
        for hint in self.spelling_hints(intent) {
            out.push_str(&format!("- {}\n", hint));
        }
        out.push_str("- Ask \"list all locations\" to see what the dataset contains.\n");
        out.push_str("- Try a broader question with fewer details.");
        out
    }

    /// One spelling hint per role filtered on; keyword filters get the
    /// generic one.
    fn spelling_hints(&self, intent: &QueryIntent) -> Vec<&'static str> {
        let mut hints = Vec::new();
        for p in &intent.filters {
            let role = match p.fields.as_slice() {
                [field] => self.mapping.role_of(field),
                _ => None,
            };
            let hint = match role {
                Some(Role::Location) => {
                    "Check the street name or try a variant (for example \"ST\" instead of \"STREET\")."
                }
                Some(Role::Date) => {
                    "Check the date; the dataset may write it another way (2025-06-24 or 06/24/2025)."
                }
                Some(Role::Identifier) => "Check the identifier digits; identifiers must match exactly.",
                Some(Role::FunctionalLocation) => {
                    "Check the functional location code; codes must match exactly."
                }
                _ => GENERIC_HINT,
            };
            if !hints.contains(&hint) {
                hints.push(hint);
            }
        }
        if hints.is_empty() {
            hints.push(GENERIC_HINT);
        }
        hints
    }
}

/// Records whose searched field equals a contains-predicate's value exactly
/// (ignoring case), e.g. `MAIN STREET` out of `MAIN STREET` and
/// `100 MAIN STREET`.
fn narrow<'r>(intent: &QueryIntent, matches: &'r [Record]) -> Vec<&'r Record> {
    let phrases: Vec<_> = intent
        .filters
        .iter()
        .filter(|p| p.operator == Operator::Contains)
        .collect();
    if phrases.is_empty() {
        return Vec::new();
    }
    matches
        .iter()
        .filter(|r| {
            phrases.iter().any(|p| {
                p.fields.iter().any(|f| {
                    r.text(f)
                        .map(|v| v.eq_ignore_ascii_case(&p.value))
                        .unwrap_or(false)
                })
            })
        })
        .collect()
}

fn count_sentence(n: usize, intent: &QueryIntent) -> String {
    let matching = if intent.filters.is_empty() {
        String::new()
    } else {
        let values: Vec<String> = intent.filters.iter().map(|p| p.value.clone()).collect();
        format!(" matching {}", values.join(" and "))
    };
    match n {
        0 => format!("There are no issues reported{}.", matching),
        1 => format!("There is 1 issue reported{}.", matching),
        n => format!("There are {} issues reported{}.", n, matching),
    }
}

fn aggregate_sentence(kind: IntentKind, agg: &Aggregate, matched: usize) -> String {
    let field = agg.field.as_deref().unwrap_or("value");
    let value = format_number(agg.value);
    match kind {
        IntentKind::Sum => format!(
            "The total {} is {} across {} {}.",
            field,
            value,
            matched,
            plural(matched, "record", "records")
        ),
        IntentKind::Average | IntentKind::Min if agg.counted == 0 => format!(
            "None of the {} matching {} has a recorded {}.",
            matched,
            plural(matched, "record", "records"),
            field
        ),
        IntentKind::Average => format!(
            "The average {} is {} (based on {} {}).",
            field,
            value,
            agg.counted,
            plural(agg.counted, "record", "records")
        ),
        IntentKind::Max => format!("The highest {} is {}.", field, value),
        _ => format!("The lowest {} is {}.", field, value),
    }
}

fn operation_name(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::Sum => "total",
        IntentKind::Average => "average",
        IntentKind::Max => "highest value",
        IntentKind::Min => "lowest value",
        _ => "result",
    }
}

/// Answer for an aggregate whose numeric column could not be detected.
pub fn no_numeric_field(kind: IntentKind) -> String {
    format!(
        "I couldn't find a numeric field to calculate the {} over.",
        operation_name(kind)
    )
}

fn zero_lead(intent: &QueryIntent) -> String {
    match intent.kind {
        IntentKind::Count => count_sentence(0, intent),
        IntentKind::Sum | IntentKind::Average | IntentKind::Max | IntentKind::Min => format!(
            "I couldn't calculate the {} because no records matched.",
            operation_name(intent.kind)
        ),
        IntentKind::Identifier => "No data found: I couldn't find an identifier for that.".to_string(),
        IntentKind::Location => "No data found: I couldn't find a location for that.".to_string(),
        IntentKind::Date => "No data found: I couldn't find any work recorded for that.".to_string(),
        IntentKind::Action => "No data found: I couldn't find any actions for that.".to_string(),
        IntentKind::List | IntentKind::Trend => {
            "I couldn't find any records matching your question.".to_string()
        }
    }
}

fn at(location: Option<&str>) -> String {
    location.map(|l| format!(" at {}", l)).unwrap_or_default()
}

fn plural<'s>(n: usize, one: &'s str, many: &'s str) -> &'s str {
    if n == 1 {
        one
    } else {
        many
    }
}

fn join_and(values: &[String]) -> String {
    match values {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
