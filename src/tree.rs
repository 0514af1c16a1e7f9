use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{AccessError, PathError};
use crate::path::KeyPath;
use crate::resolve;

/// Mapping keys keep document order.
pub type Mapping = IndexMap<String, Node>;

/// A value in a decoded YAML/JSON document.
#[derive(Debug, Clone, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Node {
    /// Name of the value kind, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Int(i) => Some(*i as f64),
            Node::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Structural equality. Ints and floats compare by value, mapping order
/// is ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Sequence(a), Node::Sequence(b)) => a == b,
            (Node::Mapping(a), Node::Mapping(b)) => a == b,
            (Node::Int(a), Node::Int(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Node {
    /// Compact JSON rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Int(i)
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Float(f)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Node::Mapping(m)
    }
}

// ── Serde ───────────────────────────────────────────────────────────

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Int(i) => serializer.serialize_i64(*i),
            Node::Float(f) => serializer.serialize_f64(*f),
            Node::String(s) => serializer.serialize_str(s),
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a YAML or JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E> {
        Ok(i64::try_from(v).map_or(Node::Float(v as f64), Node::Int))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E> {
        Ok(Node::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_unit<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Sequence(items))
    }

    /// Scalar keys are stored as their text, so `1: a` reads back as the
    /// string key `"1"` and encodes as `'1': a`. Decoding that output gives
    /// the same document again.
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(key) = access.next_key::<Node>()? {
            let key = match key {
                Node::String(s) => s,
                Node::Null => "null".to_string(),
                Node::Bool(b) => b.to_string(),
                Node::Int(i) => i.to_string(),
                Node::Float(f) => f.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "{} is not supported as a mapping key",
                        other.kind()
                    )))
                }
            };
            let value = access.next_value()?;
            map.insert(key, value);
        }
        Ok(Node::Mapping(map))
    }

    /// Tagged YAML values (`!Ref foo`) keep their value and drop the tag.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Node, A::Error> {
        let (_tag, variant) = data.variant::<String>()?;
        variant.newtype_variant()
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Node, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

// ── Document ────────────────────────────────────────────────────────

/// Out-of-band flags attached to a document. Never serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    removed: bool,
    values: BTreeMap<String, String>,
}

impl Metadata {
    pub fn removed(&self) -> bool {
        self.removed
    }

    pub fn mark_removed(&mut self, removed: bool) {
        self.removed = removed;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

/// One resource: a top-level mapping plus its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Mapping,
    metadata: Metadata,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn from_mapping(root: Mapping) -> Self {
        Document {
            root,
            metadata: Metadata::default(),
        }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    pub fn into_root(self) -> Mapping {
        self.root
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn removed(&self) -> bool {
        self.metadata.removed()
    }

    pub fn mark_removed(&mut self, removed: bool) {
        self.metadata.mark_removed(removed);
    }

    // ── Path access ─────────────────────────────────────────────────

    /// Resolve `key`. Missing keys give `None`; a `[*]` before the last
    /// segment collects one result per element.
    pub fn get(&self, key: &str) -> Result<Option<Cow<'_, Node>>, PathError> {
        self.get_path(&KeyPath::parse(key)?)
    }

    pub fn get_path(&self, path: &KeyPath) -> Result<Option<Cow<'_, Node>>, PathError> {
        resolve::get(&self.root, path)
    }

    /// Write `value` at `key`, creating intermediate mappings and sequences.
    pub fn set(&mut self, key: &str, value: impl Into<Node>) -> Result<(), PathError> {
        self.set_path(&KeyPath::parse(key)?, value.into())
    }

    pub fn set_path(&mut self, path: &KeyPath, value: Node) -> Result<(), PathError> {
        resolve::set(&mut self.root, path, value)
    }

    /// Remove whatever `key` resolves to. Missing keys are not an error.
    pub fn delete(&mut self, key: &str) -> Result<(), PathError> {
        self.delete_path(&KeyPath::parse(key)?)
    }

    pub fn delete_path(&mut self, path: &KeyPath) -> Result<(), PathError> {
        resolve::delete(&mut self.root, path)
    }

    pub fn exists(&self, key: &str) -> bool {
        KeyPath::parse(key).is_ok_and(|path| self.exists_path(&path))
    }

    pub fn exists_path(&self, path: &KeyPath) -> bool {
        matches!(self.get_path(path), Ok(Some(node)) if !node.is_null())
    }

    // ── Typed getters ───────────────────────────────────────────────

    fn get_present(&self, key: &str, expected: &'static str) -> Result<Cow<'_, Node>, AccessError> {
        match self.get(key)? {
            Some(node) if !node.is_null() => Ok(node),
            _ => Err(mismatch(key, expected, "null")),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<String, AccessError> {
        match self.get_present(key, "string")?.as_ref() {
            Node::String(s) => Ok(s.clone()),
            other => Err(mismatch(key, "string", other.kind())),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, AccessError> {
        match *self.get_present(key, "int")? {
            Node::Int(i) => Ok(i),
            Node::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            ref other => Err(mismatch(key, "int", other.kind())),
        }
    }

    pub fn get_float(&self, key: &str) -> Result<f64, AccessError> {
        let node = self.get_present(key, "float")?;
        node.as_f64()
            .ok_or_else(|| mismatch(key, "float", node.kind()))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, AccessError> {
        match *self.get_present(key, "bool")? {
            Node::Bool(b) => Ok(b),
            ref other => Err(mismatch(key, "bool", other.kind())),
        }
    }

    /// The mapping at `key`, or `None` when absent.
    pub fn get_object(&self, key: &str) -> Result<Option<Mapping>, AccessError> {
        match self.get(key)? {
            None => Ok(None),
            Some(node) => match node.into_owned() {
                Node::Null => Ok(None),
                Node::Mapping(m) => Ok(Some(m)),
                other => Err(mismatch(key, "mapping", other.kind())),
            },
        }
    }

    /// The sequence at `key`, or `None` when absent.
    pub fn get_array(&self, key: &str) -> Result<Option<Vec<Node>>, AccessError> {
        match self.get(key)? {
            None => Ok(None),
            Some(node) => match node.into_owned() {
                Node::Null => Ok(None),
                Node::Sequence(items) => Ok(Some(items)),
                other => Err(mismatch(key, "sequence", other.kind())),
            },
        }
    }

    /// A sequence of mappings at `key`; empty when absent.
    pub fn get_objects(&self, key: &str) -> Result<Vec<Mapping>, AccessError> {
        self.get_array(key)?
            .unwrap_or_default()
            .into_iter()
            .map(|item| match item {
                Node::Mapping(m) => Ok(m),
                other => Err(mismatch(key, "sequence of mappings", other.kind())),
            })
            .collect()
    }
}

fn mismatch(key: &str, expected: &'static str, found: &'static str) -> AccessError {
    AccessError::TypeMismatch {
        key: key.to_string(),
        expected,
        found,
    }
}
