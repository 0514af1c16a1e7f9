pub mod action;
pub mod codec;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod path;
mod resolve;
mod scan;
pub mod tree;

use action::Action;
use context::{Context, FailureRecord, PrintRecord};
use error::{Error, ParseError};
use tree::Document;

pub use parser::{parse_action, parse_condition};
pub use path::{is_valid_key, parse_next_segment};

// ── Core API ───────────────────────────────────────────────────────

/// The result of applying a script: the updated value plus everything
/// the actions recorded on the way.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub failures: Vec<FailureRecord>,
    pub printed: Vec<PrintRecord>,
}

/// Parse a script into actions. All or nothing.
pub fn parse_script(input: &str) -> Result<Vec<Action>, ParseError> {
    parser::parse(input)
}

/// Apply actions in order to one document.
pub fn apply_to_document(document: Document, actions: &[Action]) -> Applied<Document> {
    apply_to_document_with(Context::new(), document, actions)
}

pub fn apply_to_document_with(
    mut context: Context,
    mut document: Document,
    actions: &[Action],
) -> Applied<Document> {
    run(&mut context, &mut document, actions);
    let (failures, printed) = context.take();
    Applied {
        value: document,
        failures,
        printed,
    }
}

/// Apply actions to each document in turn. Documents marked removed are
/// left out of the result.
pub fn apply_to_documents(documents: Vec<Document>, actions: &[Action]) -> Applied<Vec<Document>> {
    apply_to_documents_with(Context::new(), documents, actions)
}

pub fn apply_to_documents_with(
    mut context: Context,
    documents: Vec<Document>,
    actions: &[Action],
) -> Applied<Vec<Document>> {
    let mut kept = Vec::with_capacity(documents.len());
    for mut document in documents {
        run(&mut context, &mut document, actions);
        if !document.removed() {
            kept.push(document);
        }
    }
    let (failures, printed) = context.take();
    Applied {
        value: kept,
        failures,
        printed,
    }
}

fn run(context: &mut Context, document: &mut Document, actions: &[Action]) {
    for action in actions {
        action.apply(context, document);
    }
}

// ── Text entry points ───────────────────────────────────────────────

/// Run a script over one YAML document.
pub fn exec_yaml(context: Context, input: &str, script: &str) -> Result<Applied<String>, Error> {
    let actions = parse_script(script)?;
    let document = Document::from_yaml(input)?;
    let applied = apply_to_document_with(context, document, &actions);
    Ok(Applied {
        value: applied.value.to_yaml()?,
        failures: applied.failures,
        printed: applied.printed,
    })
}

/// Run a script over one JSON document.
pub fn exec_json(context: Context, input: &str, script: &str) -> Result<Applied<String>, Error> {
    let actions = parse_script(script)?;
    let document = Document::from_json(input)?;
    let applied = apply_to_document_with(context, document, &actions);
    Ok(Applied {
        value: applied.value.to_json()?,
        failures: applied.failures,
        printed: applied.printed,
    })
}

/// Run a script over a `---` separated YAML stream. The value is empty
/// when every document was removed.
pub fn exec_yamls(context: Context, input: &str, script: &str) -> Result<Applied<String>, Error> {
    let actions = parse_script(script)?;
    let documents = codec::documents_from_yamls(input)?;
    let applied = apply_to_documents_with(context, documents, &actions);
    Ok(Applied {
        value: codec::documents_to_yamls(&applied.value)?,
        failures: applied.failures,
        printed: applied.printed,
    })
}

#[cfg(test)]
mod tests;
