use crate::tree::Document;

/// Selects documents by field values.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// The string at `key` equals `pattern`, or `pattern` is `*` and the
    /// string exists.
    Field { key: String, pattern: String },
    /// Every inner matcher matches. Empty never matches.
    All(Vec<Matcher>),
    /// Some inner matcher matches. Empty never matches.
    Any(Vec<Matcher>),
    Always,
    Never,
}

impl Matcher {
    pub fn field(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Matcher::Field {
            key: key.into(),
            pattern: pattern.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Matcher::Field { key, pattern } => document
                .get_string(key)
                .is_ok_and(|value| pattern == "*" || *pattern == value),
            Matcher::All(matchers) => {
                !matchers.is_empty() && matchers.iter().all(|m| m.matches(document))
            }
            Matcher::Any(matchers) => matchers.iter().any(|m| m.matches(document)),
            Matcher::Always => true,
            Matcher::Never => false,
        }
    }
}
