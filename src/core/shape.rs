//! Bounded-depth search over JSON documents whose shape we do not control.
//!
//! One generic pre-order [`walk`] is shared by small recognizers that answer
//! "is this an item?" and "is this an edge list?". Nothing here fails on
//! missing fields; a branch that does not match simply yields nothing.

use crate::domain::model::{non_empty_str, ITEM_TYPENAME};
use serde_json::Value;
use std::collections::HashSet;

/// Field names under which an item is commonly wrapped.
const ITEM_WRAPPER_FIELDS: [&str; 3] = ["nftItemByAddress", "alphaNftItemByAddress", "nftItem"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Stop,
}

/// Visits every object and array from `root` down to `max_depth` (inclusive),
/// parents before children. Scalars are never handed to the visitor.
pub fn walk<'a, F>(root: &'a Value, max_depth: usize, visit: &mut F) -> Walk
where
    F: FnMut(&'a Value, usize) -> Walk,
{
    walk_at(root, 0, max_depth, visit)
}

fn walk_at<'a, F>(node: &'a Value, depth: usize, max_depth: usize, visit: &mut F) -> Walk
where
    F: FnMut(&'a Value, usize) -> Walk,
{
    if depth > max_depth {
        return Walk::Continue;
    }

    match node {
        Value::Object(map) => {
            if visit(node, depth) == Walk::Stop {
                return Walk::Stop;
            }
            for child in map.values() {
                if walk_at(child, depth + 1, max_depth, visit) == Walk::Stop {
                    return Walk::Stop;
                }
            }
        }
        Value::Array(values) => {
            if visit(node, depth) == Walk::Stop {
                return Walk::Stop;
            }
            for child in values {
                if walk_at(child, depth + 1, max_depth, visit) == Walk::Stop {
                    return Walk::Stop;
                }
            }
        }
        _ => {}
    }

    Walk::Continue
}

/// Item discriminator plus a non-empty identifier.
pub fn is_item(value: &Value) -> bool {
    value.get("__typename").and_then(Value::as_str) == Some(ITEM_TYPENAME)
        && value.get("address").and_then(non_empty_str).is_some()
}

/// Item reachable through one of the well-known wrapper fields of `value`.
pub fn wrapped_item(value: &Value) -> Option<&Value> {
    for field in ITEM_WRAPPER_FIELDS {
        if let Some(inner @ Value::Object(_)) = value.get(field) {
            return Some(inner);
        }
    }

    // `item` is too generic a name to trust without an identifier
    value
        .get("item")
        .filter(|inner| inner.get("address").and_then(non_empty_str).is_some())
}

/// `{node}` wrappers of an `edges` sequence carried directly by `value`.
pub fn edge_list_nodes(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .get("edges")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|edge| edge.get("node"))
}

/// Collects every edge-list node with an identifier, once per identifier,
/// regardless of where the edge list sits in the document.
pub fn find_edge_list_items(root: &Value, max_depth: usize) -> Vec<&Value> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::new();

    walk(root, max_depth, &mut |value, _depth| {
        for node in edge_list_nodes(value) {
            if let Some(id) = node.get("address").and_then(non_empty_str) {
                if seen.insert(id) {
                    nodes.push(node);
                }
            }
        }
        Walk::Continue
    });

    nodes
}

/// First item-like fragment found depth-first, either an item itself or the
/// content of a wrapper field.
pub fn find_item_candidate(root: &Value, max_depth: usize) -> Option<&Value> {
    let mut found = None;

    walk(root, max_depth, &mut |value, _depth| {
        if is_item(value) {
            found = Some(value);
            return Walk::Stop;
        }
        if let Some(inner) = wrapped_item(value) {
            found = Some(inner);
            return Walk::Stop;
        }
        Walk::Continue
    });

    found
}
