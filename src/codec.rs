//! YAML and JSON encoding of documents.

use serde::Deserialize;

use crate::error::CodecError;
use crate::tree::{Document, Mapping, Node};

impl Document {
    /// Decode a single YAML document. An empty input is an empty mapping.
    pub fn from_yaml(input: &str) -> Result<Document, CodecError> {
        if input.trim().is_empty() {
            return Ok(Document::new());
        }
        into_document(serde_yaml::from_str(input)?, 0)
    }

    pub fn from_json(input: &str) -> Result<Document, CodecError> {
        into_document(serde_json::from_str(input)?, 0)
    }

    pub fn to_yaml(&self) -> Result<String, CodecError> {
        Ok(serde_yaml::to_string(self.root())?)
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self.root())?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self.root())?)
    }
}

/// Decode a `---` separated YAML stream. Empty documents are skipped.
pub fn documents_from_yamls(input: &str) -> Result<Vec<Document>, CodecError> {
    let mut documents = Vec::new();
    for (index, de) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let node = Node::deserialize(de)?;
        if node.is_null() {
            continue;
        }
        documents.push(into_document(node, index)?);
    }
    Ok(documents)
}

/// Encode documents as a YAML stream, `---` between documents.
pub fn documents_to_yamls(documents: &[Document]) -> Result<String, CodecError> {
    let mut out = String::new();
    for (i, document) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&document.to_yaml()?);
    }
    Ok(out)
}

fn into_document(node: Node, index: usize) -> Result<Document, CodecError> {
    match node {
        Node::Mapping(root) => Ok(Document::from_mapping(root)),
        Node::Null => Ok(Document::from_mapping(Mapping::new())),
        other => Err(CodecError::NotAMapping {
            index,
            found: other.kind(),
        }),
    }
}
