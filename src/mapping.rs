//! Column mapping registry.
//!
//! Imported spreadsheets arrive with arbitrary headers. The rest of the
//! engine talks in terms of a closed set of semantic [`Role`]s and asks a
//! [`ColumnMapping`] which header, if any, plays that role in the active
//! dataset.
//!
//! Resolution is case-insensitive and first-match-wins over each role's
//! alias list:
//!
//! 1. exact match, ignoring case (`"LOCATION"` resolves `location`);
//! 2. normalized match, ignoring case, spaces, underscores and hyphens
//!    (`"Functional_Location"` resolves `functional location`).
//!
//! A mapping is a pure function of the header set. Build a new one for
//! every dataset; never carry one across a switch.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Semantic field categories the engine knows how to reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    Location,
    FunctionalLocation,
    Action,
    Description,
    Identifier,
    Sequence,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Date,
        Role::Location,
        Role::FunctionalLocation,
        Role::Action,
        Role::Description,
        Role::Identifier,
        Role::Sequence,
    ];

    /// Header spellings that play this role, most specific first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Role::Date => &[
                "date",
                "work date",
                "completion date",
                "completed date",
                "reported date",
                "created on",
            ],
            Role::Location => &["location", "address", "street address", "site"],
            Role::FunctionalLocation => &[
                "functional location",
                "functional loc",
                "func loc",
                "floc",
            ],
            Role::Action => &["action", "action taken", "activity", "work performed"],
            Role::Description => &["description", "desc", "details", "notes", "problem"],
            Role::Identifier => &[
                "identifier",
                "id",
                "notification",
                "notification number",
                "order",
                "order number",
                "work order",
            ],
            Role::Sequence => &["sequence", "seq", "item", "line", "no"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Date => "date",
            Role::Location => "location",
            Role::FunctionalLocation => "functional location",
            Role::Action => "action",
            Role::Description => "description",
            Role::Identifier => "identifier",
            Role::Sequence => "sequence",
        };
        write!(f, "{}", name)
    }
}

/// Role → header resolution for one dataset.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    headers: Vec<String>,
    resolved: HashMap<Role, String>,
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

impl ColumnMapping {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut resolved = HashMap::new();
        for role in Role::ALL {
            if let Some(header) = find_header(role, headers) {
                resolved.insert(role, header);
            }
        }
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            resolved,
        }
    }

    /// All headers of the dataset, in source order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn resolve(&self, role: Role) -> Option<&str> {
        self.resolved.get(&role).map(|s| s.as_str())
    }

    /// Resolved headers for several roles, in the given order, deduplicated.
    pub fn resolve_all(&self, roles: &[Role]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for role in roles {
            if let Some(h) = self.resolve(*role) {
                if !out.iter().any(|o| o == h) {
                    out.push(h.to_string());
                }
            }
        }
        out
    }

    /// The role a header plays, if any.
    pub fn role_of(&self, header: &str) -> Option<Role> {
        self.resolved
            .iter()
            .find(|(_, h)| h.as_str() == header)
            .map(|(r, _)| *r)
    }
}

fn find_header<S: AsRef<str>>(role: Role, headers: &[S]) -> Option<String> {
    for alias in role.aliases() {
        if let Some(h) = headers
            .iter()
            .find(|h| h.as_ref().trim().eq_ignore_ascii_case(alias))
        {
            return Some(h.as_ref().to_string());
        }
    }
    for alias in role.aliases() {
        let want = normalize(alias);
        if let Some(h) = headers.iter().find(|h| normalize(h.as_ref()) == want) {
            return Some(h.as_ref().to_string());
        }
    }
    None
}
