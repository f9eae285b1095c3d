//! Serialize / deserialize continuations.
//!
//! The producing side turns successive states into patches, the consuming
//! side replays them:
//!
//! ```
//! use serde_json::json;
//! use tree_duplex::duplex::{deserialize, serialize};
//! use tree_duplex::{ArrayContexts, DiffOptions, Value};
//!
//! let first = Value::from(json!({"count": 1}));
//! let (patch, serializer) = serialize(&first, ArrayContexts::new(), DiffOptions::default());
//! let (mirror, deserializer) = deserialize(&patch);
//! assert_eq!(mirror, first);
//!
//! let second = Value::from(json!({"count": 2}));
//! let (patch, _serializer) = serializer.next(&second);
//! let (mirror, _deserializer) = deserializer.next(&patch);
//! assert_eq!(mirror, second);
//! ```
//!
//! Each `next` consumes its state and hands back the successor, so a
//! superseded state cannot be advanced twice.

use tracing::debug;

use crate::mutable::{MutableError, MutableStore, NodeId};
use crate::patch::apply::apply_patch;
use crate::patch::types::{Op, Patch};
use crate::patch_diff::{diff_with, ArrayContexts, DiffOptions, Diffable};
use crate::revision::{Revision, Revisioned};
use crate::value::Value;

// ── Producer ──────────────────────────────────────────────────────────────

/// Producer state: the last value sent.
#[derive(Debug)]
pub struct Serializer {
    previous: Value,
    contexts: ArrayContexts,
    options: DiffOptions,
    /// Revision of the store node the previous value was frozen from.
    node_revision: Option<Revision>,
}

/// Starts a stream. The first patch adds the whole value at the root.
pub fn serialize<'a>(
    value: impl Into<Diffable<'a>>,
    contexts: ArrayContexts,
    options: DiffOptions,
) -> (Patch, Serializer) {
    let value = value.into().value();
    let patch = vec![Op::Add {
        path: Vec::new(),
        value: value.clone(),
    }];
    let serializer = Serializer {
        previous: value,
        contexts,
        options,
        node_revision: None,
    };
    (patch, serializer)
}

/// Starts a stream from a store node's current snapshot.
pub fn serialize_from_store(
    store: &mut MutableStore,
    id: NodeId,
    contexts: ArrayContexts,
    options: DiffOptions,
) -> Result<(Patch, Serializer), MutableError> {
    let revision = store.revision(id)?;
    let snapshot = store.freeze(id)?;
    let (patch, mut serializer) = serialize(&snapshot, contexts, options);
    serializer.node_revision = Some(revision);
    Ok((patch, serializer))
}

impl Serializer {
    /// Diffs `value` against the last value sent; `value` becomes the new
    /// baseline.
    pub fn next<'a>(self, value: impl Into<Diffable<'a>>) -> (Patch, Serializer) {
        let value = value.into();
        let diff = diff_with(value, Some(&self.previous), &self.contexts, &[], &self.options);
        let next = Serializer {
            previous: value.value(),
            node_revision: None,
            ..self
        };
        (diff.patch, next)
    }

    /// Like [`Serializer::next`] for a store node. A node whose revision did
    /// not move since the last call yields an empty patch without diffing.
    pub fn next_from_store(self, store: &mut MutableStore, id: NodeId) -> Result<(Patch, Serializer), MutableError> {
        let revision = store.revision(id)?;
        if self.node_revision == Some(revision) {
            return Ok((Vec::new(), self));
        }
        let snapshot = store.freeze(id)?;
        let (patch, mut next) = self.next(&snapshot);
        next.node_revision = Some(revision);
        Ok((patch, next))
    }

    /// The last value sent.
    pub fn value(&self) -> &Value {
        &self.previous
    }

    pub fn contexts(&self) -> &ArrayContexts {
        &self.contexts
    }
}

// ── Consumer ──────────────────────────────────────────────────────────────

/// Consumer state: the last value reconstructed.
#[derive(Debug, Clone, Default)]
pub struct Deserializer {
    current: Value,
}

/// Starts a stream on the receiving side from an empty (`null`) document.
pub fn deserialize(patch: &[Op]) -> (Value, Deserializer) {
    Deserializer::default().next(patch)
}

impl Deserializer {
    /// Applies `patch` to the last value. Untouched sub-trees keep their
    /// identity. After a non-empty patch the root reports a newer revision
    /// than before, even if no operation reached the root. In that case the
    /// root is shallow-copied, so values returned earlier keep their
    /// revision.
    pub fn next(self, patch: &[Op]) -> (Value, Deserializer) {
        let mut value = apply_patch(&self.current, patch);
        if !patch.is_empty() {
            if patch.iter().any(|op| op.path().is_empty()) {
                debug!(ops = patch.len(), "document root replaced");
            }
            if value.same(&self.current) {
                value = value.shallow_copy();
            } else if let (Some(before), Some(after)) = (self.current.revision(), value.revision()) {
                if after <= before {
                    value.bump_revision();
                }
            }
        }
        let next = Deserializer {
            current: value.clone(),
        };
        (value, next)
    }

    /// The last value reconstructed.
    pub fn value(&self) -> &Value {
        &self.current
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
