//! Patch apply logic.
//!
//! Application is structural: every container on the path of an operation
//! that takes effect is copied before it is changed, and every other
//! container is carried over by reference. A patch in which nothing takes
//! effect returns the base itself.
//!
//! Operations that do not resolve against the current document (missing
//! parent, missing target, index out of range, a move across arrays) are
//! skipped. Producers and consumers race by design, so a stale operation is
//! not an error.

use tracing::trace;

use super::types::{Op, PathStep};
use crate::value::{array_index, object_key, Value};

// ── Individual operation applicators ─────────────────────────────────────

/// `-` appends, as in RFC 6902.
fn insert_index(step: &PathStep, len: usize) -> Option<usize> {
    match step {
        PathStep::Key(k) if k == "-" => Some(len),
        _ => array_index(step).filter(|&i| i <= len),
    }
}

fn apply_add(doc: &mut Value, path: &[PathStep], value: &Value) -> bool {
    let Some((last, parent_path)) = path.split_last() else {
        if doc.same(value) {
            return false;
        }
        *doc = value.clone();
        return true;
    };
    let index = match doc.get_path(parent_path) {
        Some(Value::Object(map)) => {
            if map.get(&*object_key(last)).is_some_and(|cur| cur.same(value)) {
                return false;
            }
            None
        }
        Some(Value::Array(items)) => match insert_index(last, items.len()) {
            Some(i) => Some(i),
            None => return false,
        },
        _ => return false,
    };
    let Some(parent) = doc.get_path_mut(parent_path) else {
        return false;
    };
    match index {
        Some(i) => match parent.array_mut() {
            Some(items) => items.insert(i, value.clone()),
            None => return false,
        },
        None => match parent.object_mut() {
            Some(map) => {
                map.insert(object_key(last).into_owned(), value.clone());
            }
            None => return false,
        },
    }
    true
}

fn apply_replace(doc: &mut Value, path: &[PathStep], value: &Value) -> bool {
    match doc.get_path(path) {
        Some(current) if current == value => return false,
        Some(_) => {}
        None => return false,
    }
    match doc.get_path_mut(path) {
        Some(slot) => {
            *slot = value.clone();
            true
        }
        None => false,
    }
}

fn apply_remove(doc: &mut Value, path: &[PathStep]) -> bool {
    let Some((last, parent_path)) = path.split_last() else {
        if doc.is_null() {
            return false;
        }
        *doc = Value::Null;
        return true;
    };
    if doc.get_path(path).is_none() {
        return false;
    }
    let Some(parent) = doc.get_path_mut(parent_path) else {
        return false;
    };
    if parent.is_array() {
        match (array_index(last), parent.array_mut()) {
            (Some(i), Some(items)) if i < items.len() => {
                items.remove(i);
                true
            }
            _ => false,
        }
    } else {
        parent
            .object_mut()
            .is_some_and(|map| map.shift_remove(&*object_key(last)).is_some())
    }
}

fn apply_move(doc: &mut Value, path: &[PathStep], from: &[PathStep]) -> bool {
    let (Some((to_step, parent_path)), Some((from_step, from_parent))) =
        (path.split_last(), from.split_last())
    else {
        return false;
    };
    if parent_path != from_parent {
        return false;
    }
    let len = match doc.get_path(parent_path) {
        Some(Value::Array(items)) => items.len(),
        _ => return false,
    };
    let (Some(from_idx), Some(to_idx)) = (array_index(from_step), array_index(to_step)) else {
        return false;
    };
    if from_idx >= len || to_idx >= len || from_idx == to_idx {
        return false;
    }
    let Some(items) = doc.get_path_mut(parent_path).and_then(Value::array_mut) else {
        return false;
    };
    let item = items.remove(from_idx);
    items.insert(to_idx, item);
    true
}

// ── Public API ────────────────────────────────────────────────────────────

/// Apply a single operation in place (copy-on-write). Returns whether the
/// document changed.
pub fn apply_op(doc: &mut Value, op: &Op) -> bool {
    let applied = match op {
        Op::Add { path, value } => apply_add(doc, path, value),
        Op::Replace { path, value } => apply_replace(doc, path, value),
        Op::Remove { path } => apply_remove(doc, path),
        Op::Move { path, from } => apply_move(doc, path, from),
    };
    if !applied {
        trace!(%op, "patch operation left the document unchanged");
    }
    applied
}

/// Apply a sequence of operations to `base`, returning the new document.
///
/// `base` is never modified. Sub-trees no operation touched are the same
/// containers as in `base`.
pub fn apply_patch(base: &Value, ops: &[Op]) -> Value {
    let mut doc = base.clone();
    for op in ops {
        apply_op(&mut doc, op);
    }
    doc
}

// ── Tests ─────────────────────────────────────────────────────────────────
