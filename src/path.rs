//! Key path language: `a.b[0].(dotted.name)[k=v].c`.
//!
//! A key is a chain of segments separated by `.`. A segment is a name with
//! an optional bracketed index. Names containing dots or slashes are
//! wrapped in parentheses.

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;
use crate::scan::{closing_index, unwrap_group, Cursor};
use crate::tree::Node;

/// How a bracketed index selects sequence elements.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexMode {
    /// `[3]`
    Normal(usize),
    /// `[+]` the last element
    Last,
    /// `[++]` a new element past the end
    Append,
    /// `[*]` every element
    Loop,
    /// `[k=v]` elements whose field `k` loosely equals `v`
    Search { key: String, value: String },
}

impl IndexMode {
    fn parse(index: &str) -> Result<IndexMode, PathError> {
        match index {
            "+" => return Ok(IndexMode::Last),
            "++" => return Ok(IndexMode::Append),
            "*" => return Ok(IndexMode::Loop),
            _ => {}
        }
        if let Some((key, value)) = index.split_once('=') {
            return Ok(IndexMode::Search {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        index
            .parse::<usize>()
            .map(IndexMode::Normal)
            .map_err(|_| PathError::InvalidIndex {
                index: index.to_string(),
            })
    }

    /// Whether this element satisfies a `Search` index. Other modes never
    /// filter by content.
    pub fn selects(&self, element: &Node) -> bool {
        match self {
            IndexMode::Search { key, value } => element
                .as_mapping()
                .and_then(|m| m.get(key))
                .is_some_and(|field| lenient_equal(field, value)),
            _ => true,
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMode::Normal(i) => write!(f, "[{}]", i),
            IndexMode::Last => f.write_str("[+]"),
            IndexMode::Append => f.write_str("[++]"),
            IndexMode::Loop => f.write_str("[*]"),
            IndexMode::Search { key, value } => write!(f, "[{}={}]", key, value),
        }
    }
}

/// One step of a key path.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub index: Option<IndexMode>,
}

/// A parsed key. Keeps the text it was parsed from for messages.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPath {
    source: String,
    segments: Vec<Segment>,
}

impl KeyPath {
    pub fn parse(key: &str) -> Result<KeyPath, PathError> {
        if key.is_empty() {
            return Err(PathError::malformed(key, "empty key"));
        }
        let mut cursor = Cursor::new(key);
        let mut segments = Vec::new();
        while !cursor.is_at_end() {
            segments.push(parse_segment(&mut cursor)?);
        }
        Ok(KeyPath {
            source: key.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse the first segment of `key`, returning it with the unparsed rest.
/// The rest is empty when the segment was the last one.
pub fn parse_next_segment(key: &str) -> Result<(Segment, &str), PathError> {
    let mut cursor = Cursor::new(key);
    let segment = parse_segment(&mut cursor)?;
    Ok((segment, cursor.remaining()))
}

/// True iff the whole key parses.
pub fn is_valid_key(key: &str) -> bool {
    KeyPath::parse(key).is_ok()
}

// ── Segment grammar ─────────────────────────────────────────────────

fn parse_segment(cursor: &mut Cursor<'_>) -> Result<Segment, PathError> {
    let key = cursor.input();

    if cursor.peek_char() == Some('(') {
        let group = cursor
            .take_group('(', ')')
            .ok_or_else(|| PathError::malformed(key, "unclosed '('"))?;
        let name = checked_name(unwrap_group(group, '(', ')'))?;
        let index = if cursor.peek_char() == Some('[') {
            Some(parse_index(cursor)?)
        } else {
            None
        };
        finish_segment(cursor)?;
        return Ok(Segment { name, index });
    }

    let rest = cursor.remaining();
    let bracket = rest.find('[');
    let dot = rest.find('.');
    match bracket {
        Some(b) if dot.map_or(true, |d| b < d) => {
            let name = checked_name(&rest[..b])?;
            cursor.advance(b);
            let index = parse_index(cursor)?;
            finish_segment(cursor)?;
            Ok(Segment {
                name,
                index: Some(index),
            })
        }
        _ => {
            let end = dot.unwrap_or(rest.len());
            let name = checked_name(&rest[..end])?;
            cursor.advance(end);
            finish_segment(cursor)?;
            Ok(Segment { name, index: None })
        }
    }
}

/// Parse `[index]` at the cursor.
fn parse_index(cursor: &mut Cursor<'_>) -> Result<IndexMode, PathError> {
    let key = cursor.input();
    let remaining = cursor.remaining();
    let end = closing_index(remaining, '[', ']')
        .ok_or_else(|| PathError::malformed(key, "unclosed '['"))?;
    let index = unwrap_group(&remaining[..=end], '[', ']');
    if index.is_empty() {
        return Err(PathError::malformed(key, "empty index"));
    }
    let mode = IndexMode::parse(index)?;
    cursor.advance(end + 1);
    Ok(mode)
}

/// After a segment: end of input, or a `.` followed by more key.
fn finish_segment(cursor: &mut Cursor<'_>) -> Result<(), PathError> {
    if cursor.is_at_end() {
        return Ok(());
    }
    if cursor.eat_char('.') {
        if cursor.is_at_end() {
            return Err(PathError::malformed(cursor.input(), "trailing '.'"));
        }
        return Ok(());
    }
    Err(PathError::malformed(
        cursor.input(),
        format!("unexpected `{}` after segment", cursor.remaining()),
    ))
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '/' | '_' | '.' | '-')
}

fn checked_name(name: &str) -> Result<String, PathError> {
    if name.is_empty() || !name.chars().all(is_name_char) {
        return Err(PathError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

// ── Loose equality ──────────────────────────────────────────────────

/// Compare a document value against search text. Numbers compare
/// numerically and booleans accept the usual spellings (`1`, `t`, `TRUE`...).
pub fn lenient_equal(node: &Node, text: &str) -> bool {
    match node {
        Node::String(s) => s == text,
        Node::Int(i) => text.parse::<f64>().is_ok_and(|f| *i as f64 == f),
        Node::Float(v) => text.parse::<f64>().is_ok_and(|f| *v == f),
        Node::Bool(b) => parse_bool(text) == Some(*b),
        Node::Null | Node::Sequence(_) | Node::Mapping(_) => false,
    }
}

/// Boolean spellings accepted in literals and search values.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
