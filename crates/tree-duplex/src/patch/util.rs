//! Utility functions for patches.

use super::types::{Op, Patch};
use tree_duplex_path::{starts_with, PathStep};

/// Creates a closure that returns `true` if an `Op` touches the subtree at
/// `prefix`: its path (or, for `move`, its source) equals the prefix or
/// descends from it.
///
/// ```
/// use tree_duplex::patch::{util::matcher, Op};
/// use tree_duplex::PathStep;
///
/// let prefix = vec![PathStep::Key("foo".into())];
/// let is_under_foo = matcher(&prefix);
///
/// let add_under_foo = Op::Add {
///     path: vec![PathStep::Key("foo".into()), PathStep::Key("bar".into())],
///     value: 1i64.into(),
/// };
/// assert!(is_under_foo(&add_under_foo));
///
/// let add_elsewhere = Op::Add {
///     path: vec![PathStep::Key("baz".into())],
///     value: 2i64.into(),
/// };
/// assert!(!is_under_foo(&add_elsewhere));
/// ```
pub fn matcher(prefix: &[PathStep]) -> impl Fn(&Op) -> bool + '_ {
    move |op: &Op| {
        starts_with(op.path(), prefix)
            || matches!(op, Op::Move { from, .. } if starts_with(from, prefix))
    }
}

/// Rebases every operation of `patch` under `prefix`.
pub fn prefix_patch(prefix: &[PathStep], patch: &[Op]) -> Patch {
    if prefix.is_empty() {
        return patch.to_vec();
    }
    patch.iter().map(|op| op.prefixed(prefix)).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────
