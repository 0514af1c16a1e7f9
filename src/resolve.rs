//! Get, set and delete by key path on a mapping tree.
//!
//! `[*]` and `[k=v]` before the last segment fan out: set and delete visit
//! every selected element, get collects per-element results for `[*]` and
//! follows the first match for `[k=v]`. Elements missing the next key are
//! skipped.

use std::borrow::Cow;

use crate::error::PathError;
use crate::path::{IndexMode, KeyPath, Segment};
use crate::tree::{Mapping, Node};

pub(crate) fn get<'a>(root: &'a Mapping, path: &KeyPath) -> Result<Option<Cow<'a, Node>>, PathError> {
    get_in(root, path.segments())
}

pub(crate) fn set(root: &mut Mapping, path: &KeyPath, value: Node) -> Result<(), PathError> {
    set_in(root, path.segments(), &value)
}

pub(crate) fn delete(root: &mut Mapping, path: &KeyPath) -> Result<(), PathError> {
    delete_in(root, path.segments())
}

// ── Get ─────────────────────────────────────────────────────────────

fn get_in<'a>(map: &'a Mapping, segments: &[Segment]) -> Result<Option<Cow<'a, Node>>, PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(None);
    };
    let Some(node) = map.get(&segment.name) else {
        return Ok(None);
    };
    let Some(index) = &segment.index else {
        return descend(node, rest, segment);
    };
    let items = match node {
        Node::Sequence(items) => items,
        Node::Null => return Ok(None),
        _ => return Err(not_a_sequence(segment)),
    };
    match index {
        IndexMode::Normal(i) => {
            let item = items.get(*i).ok_or_else(|| out_of_range(segment, *i, items.len()))?;
            descend(item, rest, segment)
        }
        IndexMode::Last => match items.last() {
            Some(item) => descend(item, rest, segment),
            None => Ok(None),
        },
        IndexMode::Append => Err(unsupported(index, "get")),
        IndexMode::Loop if rest.is_empty() => Ok(Some(Cow::Borrowed(node))),
        IndexMode::Loop => {
            let mut collected = Vec::new();
            for item in items {
                if let Some(found) = descend(item, rest, segment)? {
                    collected.push(found.into_owned());
                }
            }
            Ok(Some(Cow::Owned(Node::Sequence(collected))))
        }
        IndexMode::Search { .. } => match items.iter().find(|item| index.selects(item)) {
            Some(item) => descend(item, rest, segment),
            None => Ok(None),
        },
    }
}

fn descend<'a>(
    node: &'a Node,
    rest: &[Segment],
    segment: &Segment,
) -> Result<Option<Cow<'a, Node>>, PathError> {
    if rest.is_empty() {
        return Ok(Some(Cow::Borrowed(node)));
    }
    match node {
        Node::Mapping(child) => get_in(child, rest),
        Node::Null => Ok(None),
        _ => Err(not_a_mapping(segment)),
    }
}

// ── Set ─────────────────────────────────────────────────────────────

fn set_in(map: &mut Mapping, segments: &[Segment], value: &Node) -> Result<(), PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };
    if !writes(Some(&*map), segments) {
        return Ok(());
    }

    let Some(index) = &segment.index else {
        if rest.is_empty() {
            map.insert(segment.name.clone(), value.clone());
            return Ok(());
        }
        let child = map
            .entry(segment.name.clone())
            .or_insert_with(|| Node::Mapping(Mapping::new()));
        if child.is_null() {
            *child = Node::Mapping(Mapping::new());
        }
        return match child {
            Node::Mapping(child) => set_in(child, rest, value),
            _ => Err(not_a_mapping(segment)),
        };
    };

    let node = map
        .entry(segment.name.clone())
        .or_insert_with(|| Node::Sequence(Vec::new()));
    if node.is_null() {
        *node = Node::Sequence(Vec::new());
    }
    let Node::Sequence(items) = node else {
        return Err(not_a_sequence(segment));
    };

    if rest.is_empty() {
        return set_elements(items, index, segment, value);
    }
    for item in elements_for_set(items, index, segment)? {
        if !writes_below(Some(&*item), rest) {
            continue;
        }
        if item.is_null() {
            *item = Node::Mapping(Mapping::new());
        }
        match item {
            Node::Mapping(child) => set_in(child, rest, value)?,
            _ => return Err(not_a_mapping(segment)),
        }
    }
    Ok(())
}

/// Write `value` into the selected slots of a sequence.
fn set_elements(
    items: &mut Vec<Node>,
    index: &IndexMode,
    segment: &Segment,
    value: &Node,
) -> Result<(), PathError> {
    match index {
        IndexMode::Normal(i) if *i == items.len() => items.push(value.clone()),
        IndexMode::Normal(i) => {
            let len = items.len();
            let slot = items.get_mut(*i).ok_or_else(|| out_of_range(segment, *i, len))?;
            *slot = value.clone();
        }
        IndexMode::Last => {
            if let Some(last) = items.last_mut() {
                *last = value.clone();
            }
        }
        IndexMode::Append => items.push(value.clone()),
        IndexMode::Loop | IndexMode::Search { .. } => {
            for item in items.iter_mut().filter(|item| index.selects(item)) {
                *item = value.clone();
            }
        }
    }
    Ok(())
}

/// Elements to recurse into. `[n]` at the end and `[++]` grow the sequence
/// by one empty mapping first.
fn elements_for_set<'a>(
    items: &'a mut Vec<Node>,
    index: &IndexMode,
    segment: &Segment,
) -> Result<Vec<&'a mut Node>, PathError> {
    match index {
        IndexMode::Normal(i) if *i == items.len() => {
            items.push(Node::Mapping(Mapping::new()));
        }
        IndexMode::Append => {
            items.push(Node::Mapping(Mapping::new()));
            return select_mut(items, &IndexMode::Last, segment, "set");
        }
        _ => {}
    }
    select_mut(items, index, segment, "set")
}

/// Whether a set along `segments` lands anywhere. `[k=v]` with no match
/// and `[*]` or `[+]` over no elements do not, and then no intermediate
/// mapping or sequence may be created either. Paths that will fail report
/// true so the error surfaces from `set_in`.
fn writes(map: Option<&Mapping>, segments: &[Segment]) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return false;
    };
    let node = map.and_then(|m| m.get(&segment.name));
    let Some(index) = &segment.index else {
        return rest.is_empty() || writes_below(node, rest);
    };
    let items: &[Node] = match node {
        None | Some(Node::Null) => &[],
        Some(Node::Sequence(items)) => items,
        Some(_) => return true,
    };
    match index {
        IndexMode::Normal(i) if rest.is_empty() || *i > items.len() => true,
        IndexMode::Normal(i) => writes_below(items.get(*i), rest),
        IndexMode::Append => rest.is_empty() || writes(None, rest),
        IndexMode::Last if rest.is_empty() => !items.is_empty(),
        IndexMode::Last => items.last().is_some_and(|item| writes_below(Some(item), rest)),
        IndexMode::Loop | IndexMode::Search { .. } => items
            .iter()
            .filter(|item| index.selects(item))
            .any(|item| rest.is_empty() || writes_below(Some(item), rest)),
    }
}

fn writes_below(node: Option<&Node>, rest: &[Segment]) -> bool {
    match node {
        None | Some(Node::Null) => writes(None, rest),
        Some(Node::Mapping(child)) => writes(Some(child), rest),
        Some(_) => true,
    }
}

// ── Delete ──────────────────────────────────────────────────────────

fn delete_in(map: &mut Mapping, segments: &[Segment]) -> Result<(), PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    let Some(index) = &segment.index else {
        if rest.is_empty() {
            map.shift_remove(&segment.name);
            return Ok(());
        }
        return match map.get_mut(&segment.name) {
            None | Some(Node::Null) => Ok(()),
            Some(Node::Mapping(child)) => delete_in(child, rest),
            Some(_) => Err(not_a_mapping(segment)),
        };
    };

    let items = match map.get_mut(&segment.name) {
        None | Some(Node::Null) => return Ok(()),
        Some(Node::Sequence(items)) => items,
        Some(_) => return Err(not_a_sequence(segment)),
    };

    if rest.is_empty() {
        return delete_elements(items, index);
    }
    if matches!(index, IndexMode::Normal(i) if *i >= items.len()) {
        return Ok(());
    }
    for item in select_mut(items, index, segment, "delete")? {
        match item {
            Node::Mapping(child) => delete_in(child, rest)?,
            Node::Null => {}
            _ => return Err(not_a_mapping(segment)),
        }
    }
    Ok(())
}

fn delete_elements(items: &mut Vec<Node>, index: &IndexMode) -> Result<(), PathError> {
    match index {
        IndexMode::Normal(i) => {
            if *i < items.len() {
                items.remove(*i);
            }
        }
        IndexMode::Last => {
            items.pop();
        }
        IndexMode::Append => return Err(unsupported(index, "delete")),
        IndexMode::Loop => items.clear(),
        IndexMode::Search { .. } => items.retain(|item| !index.selects(item)),
    }
    Ok(())
}

// ── Shared ──────────────────────────────────────────────────────────

fn select_mut<'a>(
    items: &'a mut [Node],
    index: &IndexMode,
    segment: &Segment,
    operation: &'static str,
) -> Result<Vec<&'a mut Node>, PathError> {
    let len = items.len();
    match index {
        IndexMode::Normal(i) => match items.get_mut(*i) {
            Some(item) => Ok(vec![item]),
            None => Err(out_of_range(segment, *i, len)),
        },
        IndexMode::Last => Ok(items.last_mut().into_iter().collect()),
        IndexMode::Append => Err(unsupported(index, operation)),
        IndexMode::Loop | IndexMode::Search { .. } => {
            Ok(items.iter_mut().filter(|item| index.selects(item)).collect())
        }
    }
}

fn not_a_sequence(segment: &Segment) -> PathError {
    PathError::NotASequence {
        key: segment.name.clone(),
    }
}

fn not_a_mapping(segment: &Segment) -> PathError {
    PathError::NotAMapping {
        key: segment.name.clone(),
    }
}

fn out_of_range(segment: &Segment, index: usize, len: usize) -> PathError {
    PathError::OutOfRange {
        key: segment.name.clone(),
        index,
        len,
    }
}

fn unsupported(index: &IndexMode, operation: &'static str) -> PathError {
    PathError::UnsupportedIndex {
        index: index.to_string(),
        operation,
    }
}
