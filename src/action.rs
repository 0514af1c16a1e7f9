use std::fmt;

use tracing::debug;

use crate::condition::Condition;
use crate::context::Context;
use crate::error::EvalError;
use crate::path::KeyPath;
use crate::tree::{Document, Node};

/// An action argument: a literal, or a value read from the document being
/// modified.
#[derive(Debug, Clone, PartialEq)]
pub enum Valuable {
    Literal(Node),
    ValueOf(KeyPath),
}

impl Valuable {
    /// `None` when a `VALUE_OF` key is absent.
    pub fn resolve(&self, document: &Document) -> Result<Option<Node>, EvalError> {
        match self {
            Valuable::Literal(node) => Ok(Some(node.clone())),
            Valuable::ValueOf(key) => Ok(document
                .get_path(key)?
                .map(|node| node.into_owned())
                .filter(|node| !node.is_null())),
        }
    }

    fn resolve_string(&self, document: &Document) -> Result<String, EvalError> {
        match self.resolve(document)? {
            Some(Node::String(s)) => Ok(s),
            other => Err(EvalError::type_mismatch(
                &self.to_string(),
                "string",
                other.as_ref().map_or("null", Node::kind),
            )),
        }
    }
}

impl fmt::Display for Valuable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Valuable::Literal(node) => write!(f, "{}", node),
            Valuable::ValueOf(key) => write!(f, "VALUE_OF({})", key),
        }
    }
}

/// One executable script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Delete(KeyPath),
    /// Absent `VALUE_OF` sources leave the target untouched.
    Set {
        key: KeyPath,
        value: Valuable,
    },
    ReplacePart {
        key: KeyPath,
        old: String,
        new: String,
    },
    TrimPrefix {
        key: KeyPath,
        prefix: Valuable,
    },
    TrimSuffix {
        key: KeyPath,
        suffix: Valuable,
    },
    Print(KeyPath),
    /// `REMOVE()`: drop the whole document from batch output.
    MarkRemoved,
    Conditional {
        condition: Condition,
        action: Box<Action>,
    },
}

impl Action {
    /// Apply to one document. Failures are recorded in `context`, never
    /// returned.
    pub fn apply(&self, context: &mut Context, document: &mut Document) {
        debug!(action = %self, "apply");
        if let Err(err) = self.try_apply(context, document) {
            context.log(document, self, err);
        }
    }

    fn try_apply(&self, context: &mut Context, document: &mut Document) -> Result<(), EvalError> {
        match self {
            Action::Delete(key) => document.delete_path(key)?,
            Action::Set { key, value } => {
                if let Some(value) = value.resolve(document)? {
                    document.set_path(key, value)?;
                }
            }
            Action::ReplacePart { key, old, new } => {
                let current = document.get_string(key.as_str())?;
                document.set_path(key, Node::String(current.replace(old.as_str(), new)))?;
            }
            Action::TrimPrefix { key, prefix } => {
                let prefix = prefix.resolve_string(document)?;
                let current = document.get_string(key.as_str())?;
                let trimmed = current.strip_prefix(prefix.as_str()).unwrap_or(&current);
                document.set_path(key, Node::from(trimmed))?;
            }
            Action::TrimSuffix { key, suffix } => {
                let suffix = suffix.resolve_string(document)?;
                let current = document.get_string(key.as_str())?;
                let trimmed = current.strip_suffix(suffix.as_str()).unwrap_or(&current);
                document.set_path(key, Node::from(trimmed))?;
            }
            Action::Print(key) => {
                let value = document
                    .get_path(key)?
                    .map(|node| node.into_owned())
                    .unwrap_or_default();
                context.print(document, key.as_str(), value);
            }
            Action::MarkRemoved => document.mark_removed(true),
            Action::Conditional { condition, action } => {
                if condition.evaluate(document)? {
                    action.apply(context, document);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Delete(key) => write!(f, "DELETE({})", key),
            Action::Set { key, value } => write!(f, "SET({}, {})", key, value),
            Action::ReplacePart { key, old, new } => {
                write!(f, "REPLACE_PART({}, \"{}\", \"{}\")", key, old, new)
            }
            Action::TrimPrefix { key, prefix } => write!(f, "TRIM_PREFIX({}, {})", key, prefix),
            Action::TrimSuffix { key, suffix } => write!(f, "TRIM_SUFFIX({}, {})", key, suffix),
            Action::Print(key) => write!(f, "PRINT({})", key),
            Action::MarkRemoved => f.write_str("REMOVE()"),
            Action::Conditional { condition, action } => {
                write!(f, "IF {} THEN {}", condition, action)
            }
        }
    }
}
