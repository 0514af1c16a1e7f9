use std::fmt;

use thiserror::Error;

/// A script parse error. Fatal: a script with one bad line loads nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub code: &'static str,
    pub message: String,
    /// 1-based script line, when the error came from a whole script
    pub line: Option<usize>,
    /// The offending source line, trimmed
    pub source_line: Option<String>,
}

impl ParseError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        ParseError {
            code,
            message: message.into(),
            line: None,
            source_line: None,
        }
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new("rule-syntax-error", message)
    }

    pub fn invalid_key(key: &str, cause: &PathError) -> Self {
        Self::new("rule-invalid-key", format!("invalid key `{}`: {}", key, cause))
    }

    pub fn unknown_method(method: &str) -> Self {
        Self::new("rule-unknown-method", format!("unknown method `{}`", method))
    }

    pub fn argument_count(method: &str, expected: usize, found: usize) -> Self {
        Self::new(
            "rule-argument-count",
            format!(
                "{} takes {} argument(s), found {}",
                method, expected, found
            ),
        )
    }

    /// Attach the script line this error was raised for.
    pub fn at_line(mut self, line: usize, source: &str) -> Self {
        self.line = Some(line);
        self.source_line = Some(source.to_string());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, &self.source_line) {
            (Some(line), Some(source)) => write!(
                f,
                "line {}: {} ({})\n  {}",
                line, self.message, self.code, source
            ),
            (Some(line), None) => write!(f, "line {}: {} ({})", line, self.message, self.code),
            _ => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors from parsing or resolving a key path against a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("malformed key `{key}`: {reason}")]
    Malformed { key: String, reason: String },

    #[error("invalid segment name `{name}`")]
    InvalidName { name: String },

    #[error("invalid index `{index}`")]
    InvalidIndex { index: String },

    #[error("index {index} out of range for `{key}` (length {len})")]
    OutOfRange { key: String, index: usize, len: usize },

    #[error("`{key}` is not a sequence")]
    NotASequence { key: String },

    #[error("`{key}` is not a mapping")]
    NotAMapping { key: String },

    #[error("index `{index}` is not supported by {operation}")]
    UnsupportedIndex {
        index: String,
        operation: &'static str,
    },
}

impl PathError {
    pub fn malformed(key: &str, reason: impl Into<String>) -> Self {
        PathError::Malformed {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PathError::Malformed { .. } => "path-malformed",
            PathError::InvalidName { .. } => "path-invalid-name",
            PathError::InvalidIndex { .. } => "path-invalid-index",
            PathError::OutOfRange { .. } => "path-out-of-range",
            PathError::NotASequence { .. } => "path-not-a-sequence",
            PathError::NotAMapping { .. } => "path-not-a-mapping",
            PathError::UnsupportedIndex { .. } => "path-unsupported-index",
        }
    }
}

/// Errors from the typed document getters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("expected {expected} at `{key}`, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors raised while evaluating a condition or executing an action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("operator `{operator}` is not supported for {kind} values")]
    UnsupportedOperator {
        operator: &'static str,
        kind: &'static str,
    },

    #[error("literal `{literal}` is not a valid {expected}")]
    InvalidLiteral {
        literal: String,
        expected: &'static str,
    },

    #[error("LENGTH_OF needs a sequence or mapping at `{key}`, found {found}")]
    NotACollection { key: String, found: &'static str },
}

impl From<PathError> for EvalError {
    fn from(err: PathError) -> Self {
        EvalError::Access(AccessError::Path(err))
    }
}

impl EvalError {
    pub fn type_mismatch(key: &str, expected: &'static str, found: &'static str) -> Self {
        EvalError::Access(AccessError::TypeMismatch {
            key: key.to_string(),
            expected,
            found,
        })
    }

    pub fn code(&self) -> &'static str {
        match self {
            EvalError::Access(AccessError::Path(err)) => err.code(),
            EvalError::Access(AccessError::TypeMismatch { .. }) => "eval-type-mismatch",
            EvalError::UnsupportedOperator { .. } => "eval-unsupported-operator",
            EvalError::InvalidLiteral { .. } => "eval-invalid-literal",
            EvalError::NotACollection { .. } => "eval-not-a-collection",
        }
    }
}

/// Document decode and encode failures.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document {index}: top level must be a mapping, found {found}")]
    NotAMapping { index: usize, found: &'static str },
}

/// Rule configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid kubeconfig path `{0}`")]
    KubeconfigPath(String),

    #[error("invalid resource type `{0}`")]
    ResourceType(String),

    #[error("invalid resource selector `{selector}` in [{section}]")]
    Selector { section: String, selector: String },

    #[error(transparent)]
    Script(#[from] ParseError),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Umbrella error for the text-in, text-out entry points.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
