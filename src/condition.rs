use std::fmt;

use crate::error::EvalError;
use crate::path::{parse_bool, KeyPath};
use crate::tree::{Document, Node};

/// Comparison operators of `VALUE_OF` and `LENGTH_OF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    /// Two-character operators come first so `>=` is not read as `>`.
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Le,
        Operator::Ge,
        Operator::Lt,
        Operator::Gt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }

    fn compare<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Gt => left > right,
            Operator::Ge => left >= right,
            Operator::Lt => left < right,
            Operator::Le => left <= right,
        }
    }

    /// Equality-only comparison for kinds without an ordering.
    fn compare_eq(self, equal: bool, kind: &'static str) -> Result<bool, EvalError> {
        match self {
            Operator::Eq => Ok(equal),
            Operator::Ne => Ok(!equal),
            _ => Err(EvalError::UnsupportedOperator {
                operator: self.symbol(),
                kind,
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn symbol(self) -> &'static str {
        match self {
            Logic::And => "&&",
            Logic::Or => "||",
        }
    }
}

/// A parsed boolean condition. Built once per script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `VALUE_OF(key) <op> literal`
    ValueOf {
        key: KeyPath,
        operator: Operator,
        value: String,
    },
    /// `LENGTH_OF(key) <op> n`
    LengthOf {
        key: KeyPath,
        operator: Operator,
        length: i64,
    },
    Exists(KeyPath),
    Not(Box<Condition>),
    HasPrefix {
        key: KeyPath,
        prefix: String,
    },
    HasSuffix {
        key: KeyPath,
        suffix: String,
    },
    Combination {
        left: Box<Condition>,
        logic: Logic,
        right: Box<Condition>,
    },
}

impl Condition {
    pub fn combine(left: Condition, logic: Logic, right: Condition) -> Condition {
        Condition::Combination {
            left: Box::new(left),
            logic,
            right: Box::new(right),
        }
    }

    pub fn not_exists(key: KeyPath) -> Condition {
        Condition::Not(Box::new(Condition::Exists(key)))
    }

    /// Evaluate against a document. Both sides of a combination are always
    /// evaluated, so an error on either side is reported.
    pub fn evaluate(&self, document: &Document) -> Result<bool, EvalError> {
        match self {
            Condition::ValueOf {
                key,
                operator,
                value,
            } => match document.get_path(key)? {
                Some(node) => compare_value(&node, *operator, value),
                None => compare_value(&Node::Null, *operator, value),
            },
            Condition::LengthOf {
                key,
                operator,
                length,
            } => {
                let node = document.get_path(key)?;
                let len = match node.as_deref() {
                    None | Some(Node::Null) => return Ok(false),
                    Some(Node::Sequence(items)) => items.len(),
                    Some(Node::Mapping(m)) => m.len(),
                    Some(other) => {
                        return Err(EvalError::NotACollection {
                            key: key.to_string(),
                            found: other.kind(),
                        })
                    }
                };
                Ok(operator.compare(len as i64, *length))
            }
            Condition::Exists(key) => {
                Ok(matches!(document.get_path(key)?, Some(node) if !node.is_null()))
            }
            Condition::Not(inner) => Ok(!inner.evaluate(document)?),
            Condition::HasPrefix { key, prefix } => {
                Ok(document.get_string(key.as_str())?.starts_with(prefix.as_str()))
            }
            Condition::HasSuffix { key, suffix } => {
                Ok(document.get_string(key.as_str())?.ends_with(suffix.as_str()))
            }
            Condition::Combination { left, logic, right } => {
                let (left, right) = (left.evaluate(document)?, right.evaluate(document)?);
                Ok(match logic {
                    Logic::And => left && right,
                    Logic::Or => left || right,
                })
            }
        }
    }
}

/// Compare a document value against a literal by the value's kind.
fn compare_value(node: &Node, operator: Operator, literal: &str) -> Result<bool, EvalError> {
    match node {
        // A literal is never null: absent values are unequal to everything.
        Node::Null => operator.compare_eq(false, "null"),
        Node::Int(i) => Ok(operator.compare(*i as f64, parse_number(literal)?)),
        Node::Float(f) => Ok(operator.compare(*f, parse_number(literal)?)),
        Node::String(s) => operator.compare_eq(s == literal, "string"),
        Node::Bool(b) => {
            let literal = parse_bool(literal).ok_or_else(|| EvalError::InvalidLiteral {
                literal: literal.to_string(),
                expected: "bool",
            })?;
            operator.compare_eq(*b == literal, "bool")
        }
        Node::Sequence(_) => {
            let decoded = decode_json(literal, "JSON array")?;
            if !matches!(decoded, Node::Sequence(_)) {
                return Err(invalid_literal(literal, "JSON array"));
            }
            operator.compare_eq(*node == decoded, "sequence")
        }
        Node::Mapping(_) => {
            let decoded = decode_json(literal, "JSON object")?;
            if !matches!(decoded, Node::Mapping(_)) {
                return Err(invalid_literal(literal, "JSON object"));
            }
            operator.compare_eq(*node == decoded, "mapping")
        }
    }
}

fn parse_number(literal: &str) -> Result<f64, EvalError> {
    literal
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid_literal(literal, "number"))
}

fn decode_json(literal: &str, expected: &'static str) -> Result<Node, EvalError> {
    serde_json::from_str(literal).map_err(|_| invalid_literal(literal, expected))
}

fn invalid_literal(literal: &str, expected: &'static str) -> EvalError {
    EvalError::InvalidLiteral {
        literal: literal.to_string(),
        expected,
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ValueOf {
                key,
                operator,
                value,
            } => write!(f, "VALUE_OF({}) {} \"{}\"", key, operator, value),
            Condition::LengthOf {
                key,
                operator,
                length,
            } => write!(f, "LENGTH_OF({}) {} {}", key, operator, length),
            Condition::Exists(key) => write!(f, "EXISTS({})", key),
            Condition::Not(inner) => match inner.as_ref() {
                Condition::Exists(key) => write!(f, "NOT_EXISTS({})", key),
                other => write!(f, "!({})", other),
            },
            Condition::HasPrefix { key, prefix } => write!(f, "HAS_PREFIX({}, \"{}\")", key, prefix),
            Condition::HasSuffix { key, suffix } => write!(f, "HAS_SUFFIX({}, \"{}\")", key, suffix),
            Condition::Combination { left, logic, right } => {
                if matches!(left.as_ref(), Condition::Combination { .. }) {
                    write!(f, "{}", left)?;
                } else {
                    write!(f, "({})", left)?;
                }
                write!(f, " {} ({})", logic.symbol(), right)
            }
        }
    }
}
