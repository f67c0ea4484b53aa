//! Filter extraction from raw question text.
//!
//! Turns a question into an ordered list of [`Predicate`]s plus optional
//! recency sort and limit. There is no parser: independent matchers scan
//! the lower-cased text and every one of them may fire on the same query.
//!
//! | Matcher | Pattern | Predicate |
//! |---------|---------|-----------|
//! | date | `YYYY-MM-DD`, `MM/DD/YYYY`, `MM-DD-YYYY` (first hit) | date equals literal |
//! | functional location | `ABC-DEF-GHI-01` | functional location equals, upper-cased |
//! | address | `100 main street`, then bare `main street` | location contains, upper-cased |
//! | identifier | 10–12 digit run | identifier equals digits |
//! | keywords | whatever survives stop-word stripping | contains over the intent's role group |
//! | recency | `latest`, `oldest`, `last 5` | sort by ingestion time, limit |
//!
//! Identifier runs and `last N` counts are consumed before the address
//! matchers run. `drive`, `lane`, `court`, `st`, `rd` and `dr` only count as
//! street suffixes after a house number.
//!
//! Predicates whose role has no header in the active dataset are dropped
//! silently. A specific phrase that lost its role predicate is re-inserted
//! into the keyword pass so it still searches the role group as one phrase.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::intent::IntentKind;
use crate::mapping::{ColumnMapping, Role};
use crate::models::{Predicate, SortOrder};

/// Everything pulled out of one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub filters: Vec<Predicate>,
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
    /// How many specific matchers (date, functional location, address,
    /// identifier) recognised something, resolved or not.
    pub specific_hits: usize,
    /// Keyword tokens and phrases that became contains-predicates.
    pub keywords: Vec<String>,
    /// Roles a predicate was wanted for but no column plays.
    pub unresolved: Vec<Role>,
}

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d{4}-\d{2}-\d{2}\b",
        r"\b\d{1,2}/\d{1,2}/\d{4}\b",
        r"\b\d{1,2}-\d{1,2}-\d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid date pattern"))
    .collect()
});

static FUNCTIONAL_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z]+-[a-z]+-[a-z]+-\d+\b").expect("valid functional location pattern")
});

/// Suffixes that read as a street with or without a house number.
const STREET_SUFFIXES: &str = "street|avenue|road|circle|boulevard|ave|blvd";

/// Suffixes that double as ordinary nouns ("belt drive", "lane closure");
/// they only count after a house number.
const NUMBERED_ONLY_SUFFIXES: &str = "drive|lane|court|st|rd|dr";

static NUMBERED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b\d{{1,6}}\s+((?:[a-z0-9]+\s+){{0,3}}?)(?:{}|{})\b",
        STREET_SUFFIXES, NUMBERED_ONLY_SUFFIXES
    ))
    .expect("valid numbered address pattern")
});

static BARE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b((?:[a-z]+\s+){{1,3}})({})\b",
        STREET_SUFFIXES
    ))
    .expect("valid bare address pattern")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{10,}").expect("valid digit run pattern"));

static RECENCY_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(last|latest|newest|most recent|first|oldest|earliest)\s+(\d{1,4})\b")
        .expect("valid recency count pattern")
});

static RECENT_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(latest|recent|newest|last)\b").expect("valid recency pattern")
});

static OLDEST_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(oldest|earliest|first)\b").expect("valid recency pattern")
});

/// Question words, articles, prepositions, generic verbs and generic nouns
/// that never narrow a search.
const STOP_WORDS: &[&str] = &[
    // question words
    "what", "which", "who", "whom", "whose", "when", "where", "why", "how",
    // articles, pronouns, conjunctions
    "a", "an", "the", "this", "that", "these", "those", "it", "its", "i", "me", "my", "we",
    "our", "you", "your", "they", "them", "their", "and", "or", "but", "if", "then",
    // prepositions
    "of", "for", "at", "on", "in", "to", "from", "by", "with", "about", "into", "near",
    "per", "over", "under", "after", "before", "between",
    // auxiliaries and generic verbs
    "is", "are", "was", "were", "be", "been", "being", "am", "do", "does", "did", "done",
    "has", "have", "had", "can", "could", "would", "should", "will", "shall", "may",
    "might", "must", "give", "show", "list", "find", "display", "tell", "get", "see",
    "know", "need", "want", "happened", "happen", "occurred", "performed", "taken",
    "made", "fixed", "repaired", "replaced", "there", "please", "any", "anything",
    "something", "all", "every", "each", "some", "many", "much",
    "more", "most", "least", "only", "just", "also",
    // intent vocabulary
    "count", "number", "numbers", "total", "sum", "average", "avg", "mean", "maximum",
    "max", "minimum", "min", "highest", "lowest", "largest", "smallest", "trend",
    "trends", "time", "identifier", "identifiers", "id", "ids", "location", "locations",
    "address", "addresses", "date", "dates", "day", "action", "actions", "description",
    "descriptions", "latest", "recent", "newest", "last", "oldest", "earliest", "first",
    // generic record nouns
    "issue", "issues", "record", "records", "entry", "entries", "row", "rows", "item",
    "items", "problem", "problems", "notification", "notifications", "order", "orders",
    "work", "job", "jobs", "task", "tasks", "data", "info", "information", "details",
    "result", "results", "everything",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Role group searched by keyword predicates, chosen by intent.
pub fn keyword_roles(intent: IntentKind) -> &'static [Role] {
    match intent {
        IntentKind::Identifier | IntentKind::Location => {
            &[Role::Location, Role::FunctionalLocation]
        }
        IntentKind::Action | IntentKind::Date => &[Role::Action, Role::Description],
        _ => &[Role::Action, Role::Description, Role::Location],
    }
}

/// Running state shared by the specific matchers.
struct Scan<'a> {
    mapping: &'a ColumnMapping,
    out: Extraction,
    remainder: String,
    reinserted: Vec<String>,
}

impl Scan<'_> {
    /// Record a specific-matcher hit: consume `literal` from the keyword
    /// text and push the predicate, or keep the phrase for the keyword pass
    /// when the role has no column.
    fn hit(&mut self, role: Role, literal: &str, build: impl FnOnce(&str) -> Predicate) {
        self.out.specific_hits += 1;
        self.remainder = self.remainder.replacen(literal, " ", 1);
        match self.mapping.resolve(role) {
            Some(header) => self.out.filters.push(build(header)),
            None => {
                debug!(%role, value = %literal, "no column for role; predicate dropped");
                self.out.unresolved.push(role);
                self.reinserted.push(literal.to_string());
            }
        }
    }
}

/// Extract predicates, sort and limit from a question.
pub fn extract(query: &str, intent: IntentKind, mapping: &ColumnMapping) -> Extraction {
    let lowered = query.to_lowercase();
    let mut scan = Scan {
        mapping,
        out: Extraction::default(),
        remainder: lowered.clone(),
        reinserted: Vec::new(),
    };

    // Dates: first pattern with a hit wins.
    if let Some(m) = DATE_PATTERNS.iter().find_map(|re| re.find(&lowered)) {
        let literal = m.as_str();
        scan.hit(Role::Date, literal, |h| Predicate::equals(h, literal));
    }

    let text = scan.remainder.clone();
    if let Some(m) = FUNCTIONAL_LOCATION.find(&text) {
        let literal = m.as_str();
        scan.hit(Role::FunctionalLocation, literal, |h| {
            Predicate::equals(h, literal.to_uppercase())
        });
    }

    // Identifier runs are consumed before addresses.
    let text = scan.remainder.clone();
    if let Some(m) = DIGIT_RUN.find(&text) {
        let run = m.as_str();
        let digits: String = run.chars().take(12).collect();
        if run.len() > 12 {
            warn!(
                run,
                matched = %digits,
                "identifier run continues past 12 digits; match may be truncated"
            );
        }
        scan.hit(Role::Identifier, run, |h| Predicate::equals(h, digits));
    }

    // A "last N" count is taken before addresses so N never reads as a
    // house number.
    let text = scan.remainder.clone();
    let counted = RECENCY_COUNT.captures(&text).map(|caps| {
        let word = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let order = match word {
            "first" | "oldest" | "earliest" => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        let limit = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok());
        if let Some(whole) = caps.get(0) {
            scan.remainder = scan.remainder.replacen(whole.as_str(), " ", 1);
        }
        (order, limit)
    });

    let text = scan.remainder.clone();
    if let Some(literal) = find_address(&text) {
        scan.hit(Role::Location, &literal, |h| {
            Predicate::contains(vec![h.to_string()], literal.to_uppercase())
        });
    }

    let Scan {
        mut out,
        remainder,
        reinserted,
        ..
    } = scan;

    // Recency modifiers.
    if let Some((order, limit)) = counted {
        out.sort = Some(order);
        out.limit = limit;
    } else if RECENT_WORD.is_match(&remainder) {
        out.sort = Some(SortOrder::Desc);
    } else if OLDEST_WORD.is_match(&remainder) {
        out.sort = Some(SortOrder::Asc);
    }

    // Keywords.
    let roles = keyword_roles(intent);
    let fields = mapping.resolve_all(roles);
    let header_words: HashSet<String> = mapping
        .headers()
        .iter()
        .flat_map(|h| {
            h.to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in tokenize(&remainder) {
        if is_stop_word(&token) || header_words.contains(&token) {
            continue;
        }
        let token = singular(&token);
        if token.chars().count() < 2 || keywords.contains(&token) {
            continue;
        }
        keywords.push(token);
    }
    keywords.extend(reinserted);

    if !keywords.is_empty() && fields.is_empty() {
        debug!(?roles, "no column for keyword roles; keyword predicates dropped");
        out.unresolved.extend(roles.iter().copied());
    } else {
        for kw in &keywords {
            out.filters.push(Predicate::contains(fields.clone(), kw.clone()));
        }
        out.keywords = keywords;
    }

    debug!(
        filters = out.filters.len(),
        specific = out.specific_hits,
        sort = ?out.sort,
        limit = ?out.limit,
        "extracted filters"
    );
    out
}

/// Find the highest-priority address phrase: numbered form first (no stop
/// words between number and suffix), then the bare form trimmed to the
/// non-stop words directly before the suffix.
fn find_address(text: &str) -> Option<String> {
    for caps in NUMBERED_ADDRESS.captures_iter(text) {
        let between = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if between.split_whitespace().any(is_stop_word) {
            continue;
        }
        if let Some(m) = caps.get(0) {
            return Some(m.as_str().to_string());
        }
    }
    for caps in BARE_ADDRESS.captures_iter(text) {
        let words: Vec<&str> = caps
            .get(1)
            .map(|m| m.as_str().split_whitespace().collect())
            .unwrap_or_default();
        let suffix = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let kept: Vec<&str> = words
            .iter()
            .rev()
            .take_while(|w| !is_stop_word(w))
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if !kept.is_empty() {
            return Some(format!("{} {}", kept.join(" "), suffix));
        }
    }
    None
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '/')
                .trim_matches('-')
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Naive plural folding so "belts" still finds "BELT".
fn singular(token: &str) -> String {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::classify;
    use crate::models::Operator;

    fn mapping() -> ColumnMapping {
        ColumnMapping::from_headers(&[
            "Identifier",
            "Location",
            "Functional Location",
            "Action",
            "Description",
            "Date",
            "Cost",
        ])
    }

    fn run(q: &str) -> Extraction {
        extract(q, classify(q), &mapping())
    }

    #[test]
    fn test_iso_date_single_equality() {
        let ex = run("What happened on 2025-06-24?");
        assert_eq!(ex.filters, vec![Predicate::equals("Date", "2025-06-24")]);
    }

    #[test]
    fn test_iso_date_property_over_phrasings() {
        for q in [
            "2025-01-02",
            "show me 2025-01-02",
            "what happened on 2025-01-02?",
            "anything on 2025-01-02 please",
        ] {
            let ex = run(q);
            let dates: Vec<_> = ex
                .filters
                .iter()
                .filter(|p| p.fields == vec!["Date".to_string()])
                .collect();
            assert_eq!(dates.len(), 1, "query: {}", q);
            assert_eq!(dates[0].operator, Operator::Equals);
            assert_eq!(dates[0].value, "2025-01-02");
        }
    }

    #[test]
    fn test_slash_and_dash_dates() {
        let ex = run("what happened on 06/24/2025");
        assert_eq!(ex.filters, vec![Predicate::equals("Date", "06/24/2025")]);
        let ex = run("what happened on 06-24-2025");
        assert_eq!(ex.filters, vec![Predicate::equals("Date", "06-24-2025")]);
    }

    #[test]
    fn test_functional_location_upper_cased() {
        let ex = run("where is abc-pmp-stn-01");
        assert_eq!(
            ex.filters,
            vec![Predicate::equals("Functional Location", "ABC-PMP-STN-01")]
        );
    }

    #[test]
    fn test_bare_street_phrase() {
        let ex = run("Give me the identifier for main street");
        assert_eq!(
            ex.filters,
            vec![Predicate::contains(vec!["Location".to_string()], "MAIN STREET")]
        );
    }

    #[test]
    fn test_numbered_street_phrase() {
        let ex = run("what was done at 100 main street");
        assert_eq!(
            ex.filters,
            vec![Predicate::contains(
                vec!["Location".to_string()],
                "100 MAIN STREET"
            )]
        );
    }

    #[test]
    fn test_identifier_beside_street_keeps_both() {
        let ex = run("show work order 1234567890 at main street");
        let ids: Vec<_> = ex
            .filters
            .iter()
            .filter(|p| p.fields == vec!["Identifier".to_string()])
            .collect();
        assert_eq!(ids, vec![&Predicate::equals("Identifier", "1234567890")]);
        assert!(ex.filters.contains(&Predicate::contains(
            vec!["Location".to_string()],
            "MAIN STREET"
        )));
    }

    #[test]
    fn test_last_n_beside_street_keeps_limit() {
        let ex = run("show the last 3 jobs on oak avenue");
        assert_eq!(ex.sort, Some(SortOrder::Desc));
        assert_eq!(ex.limit, Some(3));
        assert_eq!(
            ex.filters,
            vec![Predicate::contains(vec!["Location".to_string()], "OAK AVENUE")]
        );
    }

    #[test]
    fn test_numbered_address_rejects_stop_words() {
        let ex = run("pump 4 on oak avenue");
        assert!(ex.filters.contains(&Predicate::contains(
            vec!["Location".to_string()],
            "OAK AVENUE"
        )));
    }

    #[test]
    fn test_drive_needs_house_number() {
        let ex = run("what action was taken on the belt drive");
        assert!(ex
            .filters
            .iter()
            .all(|p| p.fields != vec!["Location".to_string()]));
        assert_eq!(ex.specific_hits, 0);

        let ex = run("where is 77 pine drive");
        assert_eq!(
            ex.filters,
            vec![Predicate::contains(vec!["Location".to_string()], "77 PINE DRIVE")]
        );
    }

    #[test]
    fn test_identifier_digits() {
        for id in ["1234567890", "12345678901", "123456789012"] {
            let q = format!("what is the location of {}", id);
            let ex = run(&q);
            let ids: Vec<_> = ex
                .filters
                .iter()
                .filter(|p| p.fields == vec!["Identifier".to_string()])
                .collect();
            assert_eq!(ids.len(), 1);
            assert_eq!(ids[0].value, id);
            assert_eq!(ids[0].operator, Operator::Equals);
        }
    }

    #[test]
    fn test_identifier_overlong_run_truncates() {
        let ex = run("status of 12345678901234");
        let id = ex
            .filters
            .iter()
            .find(|p| p.fields == vec!["Identifier".to_string()])
            .map(|p| p.value.clone());
        assert_eq!(id.as_deref(), Some("123456789012"));
    }

    #[test]
    fn test_short_numbers_are_not_identifiers() {
        let ex = run("show 123456789");
        assert!(ex
            .filters
            .iter()
            .all(|p| p.fields != vec!["Identifier".to_string()]));
    }

    #[test]
    fn test_no_filters_for_count_everything() {
        let ex = run("How many issues are there?");
        assert!(ex.filters.is_empty());
        assert_eq!(ex.specific_hits, 0);
    }

    #[test]
    fn test_keywords_follow_intent_roles() {
        let ex = run("what action fixed the belts");
        assert_eq!(ex.keywords, vec!["belt".to_string()]);
        assert_eq!(
            ex.filters,
            vec![Predicate::contains(
                vec!["Action".to_string(), "Description".to_string()],
                "belt"
            )]
        );
    }

    #[test]
    fn test_list_keywords_search_text_roles() {
        let ex = run("pump leak");
        assert_eq!(ex.filters.len(), 2);
        for p in &ex.filters {
            assert_eq!(
                p.fields,
                vec![
                    "Action".to_string(),
                    "Description".to_string(),
                    "Location".to_string()
                ]
            );
        }
    }

    #[test]
    fn test_header_names_are_not_keywords() {
        let ex = run("what is the average cost");
        assert!(ex.filters.is_empty());
    }

    #[test]
    fn test_unresolved_role_is_dropped() {
        let m = ColumnMapping::from_headers(&["Location", "Action"]);
        let ex = extract("what happened on 2025-06-24", IntentKind::Date, &m);
        assert!(ex.filters.iter().all(|p| p.fields != vec!["Date".to_string()]));
        assert_eq!(ex.specific_hits, 1);
        assert_eq!(ex.unresolved, vec![Role::Date]);
    }

    #[test]
    fn test_unresolved_address_reinserted_as_keyword() {
        let m = ColumnMapping::from_headers(&["Notes", "Action"]);
        let ex = extract("anything at oak avenue", IntentKind::List, &m);
        assert!(ex.keywords.contains(&"oak avenue".to_string()));
        assert!(ex
            .filters
            .iter()
            .any(|p| p.value == "oak avenue" && p.operator == Operator::Contains));
    }

    #[test]
    fn test_recency_latest() {
        let ex = run("show the latest issues");
        assert_eq!(ex.sort, Some(SortOrder::Desc));
        assert_eq!(ex.limit, None);
    }

    #[test]
    fn test_recency_oldest() {
        let ex = run("show the oldest record");
        assert_eq!(ex.sort, Some(SortOrder::Asc));
    }

    #[test]
    fn test_recency_last_n() {
        let ex = run("show the last 5 records");
        assert_eq!(ex.sort, Some(SortOrder::Desc));
        assert_eq!(ex.limit, Some(5));
        assert!(ex.filters.is_empty());
    }

    #[test]
    fn test_all_matchers_fire_together() {
        let ex = run("what action on 2025-06-24 at 100 main street for 1234567890");
        assert_eq!(ex.specific_hits, 3);
        assert!(ex.filters.contains(&Predicate::equals("Date", "2025-06-24")));
        assert!(ex.filters.contains(&Predicate::equals("Identifier", "1234567890")));
        assert!(ex.filters.contains(&Predicate::contains(
            vec!["Location".to_string()],
            "100 MAIN STREET"
        )));
    }

    #[test]
    fn test_empty_query() {
        let ex = run("");
        assert_eq!(ex, Extraction::default());
    }
}
