use std::fmt;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::action::Action;
use crate::error::EvalError;
use crate::tree::{Document, Node};

/// A failed action on one document.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    /// Configured log keys and their values in the failing document
    pub fields: IndexMap<String, Node>,
    pub action: Action,
    pub error: EvalError,
}

impl FailureRecord {
    pub fn field(&self, key: &str) -> Option<&Node> {
        self.fields.get(key)
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.error)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// A value emitted by `PRINT`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintRecord {
    pub fields: IndexMap<String, Node>,
    pub key: String,
    pub value: Node,
}

impl fmt::Display for PrintRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// Collects action failures and printed values across documents.
#[derive(Debug, Clone, Default)]
pub struct Context {
    log_keys: Vec<String>,
    failures: Vec<FailureRecord>,
    printed: Vec<PrintRecord>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Failure and print records will carry the values of these keys,
    /// e.g. `metadata.namespace` and `metadata.name`.
    pub fn with_log_keys<I, S>(log_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Context {
            log_keys: log_keys.into_iter().map(Into::into).collect(),
            ..Context::default()
        }
    }

    pub fn log(&mut self, document: &Document, action: &Action, error: EvalError) {
        let fields = self.project(document);
        warn!(action = %action, code = error.code(), error = %error, "action failed");
        self.failures.push(FailureRecord {
            fields,
            action: action.clone(),
            error,
        });
    }

    pub fn print(&mut self, document: &Document, key: &str, value: Node) {
        let fields = self.project(document);
        info!(key, value = %value, "print");
        self.printed.push(PrintRecord {
            fields,
            key: key.to_string(),
            value,
        });
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn printed(&self) -> &[PrintRecord] {
        &self.printed
    }

    /// Drain the collected records.
    pub fn take(&mut self) -> (Vec<FailureRecord>, Vec<PrintRecord>) {
        (
            std::mem::take(&mut self.failures),
            std::mem::take(&mut self.printed),
        )
    }

    fn project(&self, document: &Document) -> IndexMap<String, Node> {
        let mut fields = IndexMap::new();
        for key in &self.log_keys {
            match document.get(key) {
                Ok(value) => {
                    fields.insert(key.clone(), value.map(|v| v.into_owned()).unwrap_or_default());
                }
                Err(err) => warn!(key = %key, error = %err, "cannot read log key"),
            }
        }
        fields
    }
}
