//! Structural diff: compute the patch that turns an old value into a new one.
//!
//! Besides the patch, every diff reports a change *magnitude* and a *field*
//! count, summed bottom-up: a differing scalar is one changed field out of
//! one, an object is the sum over its properties. When more than
//! [`DiffOptions::replace_threshold`] of a container's fields changed, its
//! per-field operations are dropped in favour of a single `replace` of the
//! whole container (which then counts as one changed field out of one).
//!
//! Arrays matched by an [`ArrayContext`] are reconciled by identity key
//! (insert / remove / move, then a recursive diff of each matched pair). Arrays
//! without a context are diffed position by position.

pub mod context;
pub mod keyed;

use tracing::debug;
use tree_duplex_path::{format_json_pointer, Path, PathStep};

use crate::patch::types::{Op, Patch};
use crate::patch::util::prefix_patch;
use crate::value::{Map, Value};

pub use context::{ArrayContext, ArrayContexts, ItemKey};
pub use keyed::{match_keyed, Instruction, KeyedMatch};

// ── Inputs ────────────────────────────────────────────────────────────────

/// A value that already knows its own delta against the previous state.
pub trait PatchSource {
    /// Operations relative to the value's own root.
    fn get_patch(&self) -> Patch;

    /// The value after the patch.
    fn value(&self) -> Value;
}

/// The new side of a diff.
#[derive(Clone, Copy)]
pub enum Diffable<'a> {
    Plain(&'a Value),
    PreDiffed(&'a dyn PatchSource),
}

impl Diffable<'_> {
    pub fn value(&self) -> Value {
        match self {
            Diffable::Plain(v) => (*v).clone(),
            Diffable::PreDiffed(src) => src.value(),
        }
    }
}

impl<'a> From<&'a Value> for Diffable<'a> {
    fn from(v: &'a Value) -> Self {
        Diffable::Plain(v)
    }
}

/// A value paired with the patch that produced it.
#[derive(Debug, Clone)]
pub struct PatchedValue {
    pub value: Value,
    pub patch: Patch,
}

impl PatchSource for PatchedValue {
    fn get_patch(&self) -> Patch {
        self.patch.clone()
    }

    fn value(&self) -> Value {
        self.value.clone()
    }
}

// ── Options & result ──────────────────────────────────────────────────────

/// Tuning for the diff engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    /// A container whose changed/total field ratio is strictly above this is
    /// replaced wholesale.
    pub replace_threshold: f64,
    /// Diff arrays without an [`ArrayContext`] element by element. When
    /// `false` such arrays are either unchanged or replaced.
    pub positional_arrays: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            replace_threshold: 0.5,
            positional_arrays: true,
        }
    }
}

/// A patch plus the size of the change it encodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    pub patch: Patch,
    pub magnitude: usize,
    pub fields: usize,
}

impl Diff {
    fn unchanged() -> Self {
        Self {
            patch: Vec::new(),
            magnitude: 0,
            fields: 1,
        }
    }

    fn single(op: Op) -> Self {
        Self {
            patch: vec![op],
            magnitude: 1,
            fields: 1,
        }
    }

    fn empty() -> Self {
        Self {
            patch: Vec::new(),
            magnitude: 0,
            fields: 0,
        }
    }

    fn absorb(&mut self, other: Diff) {
        self.patch.extend(other.patch);
        self.magnitude += other.magnitude;
        self.fields += other.fields;
    }
}

// ── Public API ────────────────────────────────────────────────────────────

/// Generate the patch that transforms `old` into `new` at the root, with
/// default options. `None` means there is no old value.
pub fn diff(new: &Value, old: Option<&Value>, contexts: &ArrayContexts) -> Patch {
    diff_with(new.into(), old, contexts, &[], &DiffOptions::default()).patch
}

/// Full-control diff at an arbitrary `path`. Every operation of the result
/// is addressed from the document root, i.e. starts with `path`.
pub fn diff_with(
    new: Diffable<'_>,
    old: Option<&Value>,
    contexts: &ArrayContexts,
    path: &[PathStep],
    options: &DiffOptions,
) -> Diff {
    match new {
        Diffable::Plain(value) => {
            let differ = Differ { contexts, options };
            differ.diff_at(value, old, &mut path.to_vec())
        }
        Diffable::PreDiffed(source) => {
            let value = source.value();
            match old {
                Some(old) if value.same(old) => Diff::unchanged(),
                None => Diff::single(Op::Add {
                    path: path.to_vec(),
                    value,
                }),
                Some(_) => {
                    let patch = prefix_patch(path, &source.get_patch());
                    let n = patch.len();
                    Diff {
                        patch,
                        magnitude: n,
                        fields: n.max(1),
                    }
                }
            }
        }
    }
}

// ── Core recursive differ ─────────────────────────────────────────────────

struct Differ<'a> {
    contexts: &'a ArrayContexts,
    options: &'a DiffOptions,
}

impl Differ<'_> {
    fn diff_at(&self, new: &Value, old: Option<&Value>, path: &mut Path) -> Diff {
        let Some(old) = old else {
            return Diff::single(Op::Add {
                path: path.clone(),
                value: new.clone(),
            });
        };
        if new.same(old) {
            return Diff::unchanged();
        }
        match (new, old) {
            (Value::Array(n), Value::Array(o)) => match self.contexts.find(path) {
                Some(ctx) => self.diff_keyed(ctx, new, old, path),
                None if self.options.positional_arrays => {
                    debug!(path = %format_json_pointer(path), "no array context, diffing by position");
                    self.diff_positional(n, o, new, path)
                }
                None if new == old => Diff::unchanged(),
                None => self.replace(path, new),
            },
            (Value::Object(n), Value::Object(o)) => self.diff_object(n, o, new, path),
            _ => self.replace(path, new),
        }
    }

    fn replace(&self, path: &Path, new: &Value) -> Diff {
        Diff::single(Op::Replace {
            path: path.clone(),
            value: new.clone(),
        })
    }

    /// Swaps accumulated per-field operations for one `replace` when too much
    /// of the container changed.
    fn collapse(&self, acc: Diff, new: &Value, path: &Path) -> Diff {
        if acc.fields == 0 {
            return Diff::unchanged();
        }
        let ratio = acc.magnitude as f64 / acc.fields as f64;
        if ratio > self.options.replace_threshold {
            debug!(
                path = %format_json_pointer(path),
                magnitude = acc.magnitude,
                fields = acc.fields,
                "replacing container wholesale"
            );
            return self.replace(path, new);
        }
        acc
    }

    fn diff_object(&self, new_map: &Map, old_map: &Map, new: &Value, path: &mut Path) -> Diff {
        let mut acc = Diff::empty();
        for (key, value) in new_map {
            path.push(PathStep::Key(key.clone()));
            acc.absorb(self.diff_at(value, old_map.get(key), path));
            path.pop();
        }
        for key in old_map.keys() {
            if !new_map.contains_key(key) {
                path.push(PathStep::Key(key.clone()));
                acc.absorb(Diff::single(Op::Remove { path: path.clone() }));
                path.pop();
            }
        }
        self.collapse(acc, new, path)
    }

    fn diff_positional(
        &self,
        new_items: &[Value],
        old_items: &[Value],
        new: &Value,
        path: &mut Path,
    ) -> Diff {
        let mut acc = Diff::empty();
        for (i, item) in new_items.iter().enumerate() {
            path.push(PathStep::Index(i));
            acc.absorb(self.diff_at(item, old_items.get(i), path));
            path.pop();
        }
        // From the back, so earlier indices stay valid.
        for i in (new_items.len()..old_items.len()).rev() {
            path.push(PathStep::Index(i));
            acc.absorb(Diff::single(Op::Remove { path: path.clone() }));
            path.pop();
        }
        self.collapse(acc, new, path)
    }

    fn diff_keyed(&self, ctx: &ArrayContext, new: &Value, old: &Value, path: &mut Path) -> Diff {
        let (Some(new_items), Some(old_items)) = (new.as_array(), old.as_array()) else {
            return self.replace(path, new);
        };
        let old_keys = ctx.keys_of(old);
        let new_keys = ctx.compute(new);
        let matched = match_keyed(&old_keys, &new_keys);
        ctx.remember(new, new_keys);

        let at = |i: usize| {
            let mut p = path.clone();
            p.push(PathStep::Index(i));
            p
        };
        let mut patch: Patch = matched
            .instructions
            .iter()
            .map(|ins| match *ins {
                Instruction::Inserted { at: pos, item } => Op::Add {
                    path: at(pos),
                    value: new_items[item].clone(),
                },
                Instruction::Moved { from, to } => Op::Move {
                    path: at(to),
                    from: at(from),
                },
                Instruction::Removed { at: pos } => Op::Remove { path: at(pos) },
            })
            .collect();
        let mut magnitude = patch.len();

        // Matched pairs sit at their new index once the structural ops ran.
        for &(j, i) in &matched.pairs {
            if new_items[j].same(&old_items[i]) {
                continue;
            }
            path.push(PathStep::Index(j));
            let sub = self.diff_at(&new_items[j], Some(&old_items[i]), path);
            path.pop();
            if !sub.patch.is_empty() {
                magnitude += 1;
                patch.extend(sub.patch);
            }
        }

        Diff {
            patch,
            magnitude,
            fields: new_items.len().max(1),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply::apply_patch;
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        Value::from(j)
    }

    fn key(k: &str) -> PathStep {
        PathStep::Key(k.into())
    }

    fn none() -> ArrayContexts {
        ArrayContexts::new()
    }

    fn round_trip(old: serde_json::Value, new: serde_json::Value, contexts: &ArrayContexts) {
        let (old, new) = (v(old), v(new));
        let patch = diff(&new, Some(&old), contexts);
        assert_eq!(apply_patch(&old, &patch), new, "patch: {patch:?}");
    }

    #[test]
    fn identical_reference_is_empty() {
        let x = v(json!({"a": [1, {"b": 2}]}));
        let d = diff_with((&x).into(), Some(&x), &none(), &[], &DiffOptions::default());
        assert!(d.patch.is_empty());
        assert_eq!(d.magnitude, 0);
        assert_eq!(d.fields, 1);
    }

    #[test]
    fn equal_content_is_empty() {
        let d = diff(&v(json!({"a": {"b": [1]}})), Some(&v(json!({"a": {"b": [1]}}))), &none());
        assert!(d.is_empty());
    }

    #[test]
    fn missing_old_adds_wholesale() {
        let new = v(json!({"a": 1}));
        assert_eq!(diff(&new, None, &none()), vec![Op::Add { path: vec![], value: new.clone() }]);
    }

    #[test]
    fn single_leaf_change() {
        let patch = diff(
            &v(json!({"a": 1, "b": 4, "c": {"d": 4, "e": 5}})),
            Some(&v(json!({"a": 1, "b": 2, "c": {"d": 4, "e": 5}}))),
            &none(),
        );
        assert_eq!(patch, vec![Op::Replace { path: vec![key("b")], value: v(json!(4)) }]);
    }

    #[test]
    fn mostly_changed_object_is_replaced() {
        let new = v(json!({"a": 10, "b": 20, "c": 3}));
        let patch = diff(&new, Some(&v(json!({"a": 1, "b": 2, "c": 3}))), &none());
        assert_eq!(patch, vec![Op::Replace { path: vec![], value: new.clone() }]);
    }

    #[test]
    fn exactly_half_changed_is_not_replaced() {
        let patch = diff(
            &v(json!({"a": 10, "b": 2})),
            Some(&v(json!({"a": 1, "b": 2}))),
            &none(),
        );
        assert_eq!(patch, vec![Op::Replace { path: vec![key("a")], value: v(json!(10)) }]);
    }

    #[test]
    fn ratio_is_computed_bottom_up() {
        // Top level: one of two keys differs, but `big` holds four unchanged
        // fields, so the ratio is 1/5 rather than 1/2.
        let patch = diff(
            &v(json!({"x": 2, "big": {"a": 1, "b": 1, "c": 1, "d": 1}})),
            Some(&v(json!({"x": 1, "big": {"a": 1, "b": 1, "c": 1, "d": 1}}))),
            &none(),
        );
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].path(), &vec![key("x")]);
    }

    #[test]
    fn nested_collapse_counts_as_one_field() {
        let new = v(json!({"inner": {"p": 9, "q": 9}, "k1": 1, "k2": 2}));
        let old = v(json!({"inner": {"p": 1, "q": 1}, "k1": 1, "k2": 2}));
        let patch = diff(&new, Some(&old), &none());
        assert_eq!(
            patch,
            vec![Op::Replace { path: vec![key("inner")], value: new.get_key("inner").unwrap().clone() }]
        );
    }

    #[test]
    fn threshold_is_configurable() {
        let options = DiffOptions { replace_threshold: 1.0, ..DiffOptions::default() };
        let new = v(json!({"a": 10, "b": 20}));
        let d = diff_with((&new).into(), Some(&v(json!({"a": 1, "b": 2}))), &none(), &[], &options);
        assert_eq!(d.patch.len(), 2);
    }

    #[test]
    fn removed_keys() {
        let patch = diff(
            &v(json!({"a": 1, "b": 2, "c": 3})),
            Some(&v(json!({"a": 1, "b": 2, "c": 3, "d": 4}))),
            &none(),
        );
        assert_eq!(patch, vec![Op::Remove { path: vec![key("d")] }]);
    }

    #[test]
    fn type_change_is_replace() {
        let patch = diff(&v(json!({"a": [1]})), Some(&v(json!({"a": {"0": 1}}))), &none());
        assert_eq!(patch, vec![Op::Replace { path: vec![], value: v(json!({"a": [1]})) }]);
        let patch = diff(&v(json!([1])), Some(&v(json!("x"))), &none());
        assert_eq!(patch, vec![Op::Replace { path: vec![], value: v(json!([1])) }]);
    }

    #[test]
    fn null_old_value_is_replaced_not_added() {
        let patch = diff(&v(json!([5, 1])), Some(&v(json!([null, 1]))), &none());
        assert_eq!(apply_patch(&v(json!([null, 1])), &patch), v(json!([5, 1])));
    }

    #[test]
    fn keyed_append() {
        let contexts = ArrayContexts::new().with("", "id");
        let patch = diff(&v(json!([1, 2, 3, 4])), Some(&v(json!([1, 2, 3]))), &contexts);
        assert_eq!(patch, vec![Op::Add { path: vec![PathStep::Index(3)], value: v(json!(4)) }]);
    }

    #[test]
    fn keyed_reorder_is_one_move() {
        let contexts = ArrayContexts::new().with("", "id");
        let patch = diff(
            &v(json!([{"id": 1}, {"id": 3}, {"id": 2}])),
            Some(&v(json!([{"id": 1}, {"id": 2}, {"id": 3}]))),
            &contexts,
        );
        assert_eq!(
            patch,
            vec![Op::Move { path: vec![PathStep::Index(1)], from: vec![PathStep::Index(2)] }]
        );
    }

    #[test]
    fn keyed_matched_items_are_diffed_in_place() {
        let contexts = ArrayContexts::new().with("/todos", "id");
        let old = json!({
            "owner": "me",
            "title": "list",
            "todos": [{"id": "a", "done": false, "t": "x", "n": 1}, {"id": "b", "done": false, "t": "y", "n": 2}]
        });
        let new = json!({
            "owner": "me",
            "title": "list",
            "todos": [{"id": "b", "done": true, "t": "y", "n": 2}, {"id": "a", "done": false, "t": "x", "n": 1}]
        });
        let patch = diff(&v(new.clone()), Some(&v(old.clone())), &contexts);
        assert_eq!(patch.len(), 2);
        assert!(matches!(patch[0], Op::Move { .. }));
        assert_eq!(
            patch[1],
            Op::Replace {
                path: vec![key("todos"), PathStep::Index(0), key("done")],
                value: v(json!(true))
            }
        );
        round_trip(old, new, &contexts);
    }

    #[test]
    fn wildcard_contexts_reach_nested_arrays() {
        let contexts = ArrayContexts::new().with("/boards/*/cards", "id");
        round_trip(
            json!({"boards": [{"cards": [{"id": 1}, {"id": 2}, {"id": 3}]}, {"cards": []}]}),
            json!({"boards": [{"cards": [{"id": 3}, {"id": 1}, {"id": 4}]}, {"cards": [{"id": 2}]}]}),
            &contexts,
        );
    }

    #[test]
    fn numeric_object_keys_reach_keyed_arrays() {
        let contexts = ArrayContexts::new().with("/years/2024", "id");
        let old = json!({"years": {"2024": [{"id": 1}, {"id": 2}, {"id": 3}]}});
        let new = json!({"years": {"2024": [{"id": 1}, {"id": 3}, {"id": 2}]}});
        let patch = diff(&v(new.clone()), Some(&v(old.clone())), &contexts);
        assert_eq!(
            patch,
            vec![Op::Move {
                path: vec![key("years"), key("2024"), PathStep::Index(1)],
                from: vec![key("years"), key("2024"), PathStep::Index(2)],
            }]
        );
        round_trip(old, new, &contexts);
    }

    #[test]
    fn positional_arrays_round_trip() {
        round_trip(json!([1, 2, 3]), json!([1, 2, 3, 4]), &none());
        round_trip(json!([1, 2, 3, 4, 5]), json!([1, 2]), &none());
        round_trip(json!([{"a": 1}, [1, 2]]), json!([{"a": 2}, [1, 2, 3]]), &none());
        let patch = diff(&v(json!([1, 2, 3, 4])), Some(&v(json!([1, 2, 3]))), &none());
        assert_eq!(patch, vec![Op::Add { path: vec![PathStep::Index(3)], value: v(json!(4)) }]);
    }

    #[test]
    fn positional_removals_run_backwards() {
        let patch = diff(&v(json!([1, 2, 3, 4, 5, 6])), Some(&v(json!([1, 2, 3, 4, 5, 6, 7, 8]))), &none());
        assert_eq!(
            patch,
            vec![
                Op::Remove { path: vec![PathStep::Index(7)] },
                Op::Remove { path: vec![PathStep::Index(6)] },
            ]
        );
    }

    #[test]
    fn arrays_without_positional_fallback_are_replaced() {
        let options = DiffOptions { positional_arrays: false, ..DiffOptions::default() };
        let new = v(json!({"l": [1, 2, 3, 4], "a": 1, "b": 2, "c": 3}));
        let old = v(json!({"l": [1, 2, 3], "a": 1, "b": 2, "c": 3}));
        let d = diff_with((&new).into(), Some(&old), &none(), &[], &options);
        assert_eq!(
            d.patch,
            vec![Op::Replace { path: vec![key("l")], value: new.get_key("l").unwrap().clone() }]
        );
        let same = v(json!([1, 2]));
        let d = diff_with((&same).into(), Some(&v(json!([1, 2]))), &none(), &[], &options);
        assert!(d.patch.is_empty());
    }

    #[test]
    fn pre_diffed_values_are_trusted_and_rebased() {
        let source = PatchedValue {
            value: v(json!({"x": 2})),
            patch: vec![Op::Replace { path: vec![key("x")], value: v(json!(2)) }],
        };
        let old = v(json!({"x": 1}));
        let d = diff_with(
            Diffable::PreDiffed(&source),
            Some(&old),
            &none(),
            &[key("doc")],
            &DiffOptions::default(),
        );
        assert_eq!(
            d.patch,
            vec![Op::Replace { path: vec![key("doc"), key("x")], value: v(json!(2)) }]
        );

        let same = PatchedValue { value: old.clone(), patch: vec![] };
        let d = diff_with(Diffable::PreDiffed(&same), Some(&old), &none(), &[], &DiffOptions::default());
        assert!(d.patch.is_empty());
    }

    #[test]
    fn sub_path_diffs_are_rooted() {
        let d = diff_with(
            (&v(json!(2))).into(),
            Some(&v(json!(1))),
            &none(),
            &[key("a"), PathStep::Index(0)],
            &DiffOptions::default(),
        );
        assert_eq!(d.patch[0].path(), &vec![key("a"), PathStep::Index(0)]);
    }
}
