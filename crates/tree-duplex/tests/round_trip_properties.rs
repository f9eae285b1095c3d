mod common;

use common::generators::{json_strategy, keyed_list};
use common::{key, over_the_wire, round_trip, v};
use proptest::prelude::*;
use serde_json::json;
use tree_duplex::patch::Op;
use tree_duplex::{apply_patch, diff, ArrayContexts, PathStep};

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn diff_then_apply_reproduces_new(old in json_strategy(), new in json_strategy()) {
        let (old, new) = (v(old), v(new));
        let (patch, applied) = round_trip(&old, &new, &ArrayContexts::new());
        prop_assert_eq!(&applied, &new, "patch: {:?}", patch);
    }

    #[test]
    fn keyed_lists_round_trip(old in keyed_list(), new in keyed_list()) {
        let contexts = ArrayContexts::new().with("", "id");
        let (old, new) = (v(old), v(new));
        let (patch, applied) = round_trip(&old, &new, &contexts);
        prop_assert_eq!(&applied, &new, "patch: {:?}", patch);
    }

    #[test]
    fn nested_keyed_lists_round_trip(a in keyed_list(), b in keyed_list(), c in keyed_list()) {
        let contexts = ArrayContexts::new().with("/groups/*/items", "id");
        let old = v(json!({"groups": [{"items": a.clone()}, {"items": b.clone()}]}));
        let new = v(json!({"groups": [{"items": c}, {"items": a}], "extra": b}));
        let (patch, applied) = round_trip(&old, &new, &contexts);
        prop_assert_eq!(&applied, &new, "patch: {:?}", patch);
    }

    #[test]
    fn same_value_gives_empty_patch(value in json_strategy()) {
        let value = v(value);
        prop_assert!(diff(&value, Some(&value), &ArrayContexts::new()).is_empty());
    }

    #[test]
    fn wire_form_is_lossless(old in json_strategy(), new in json_strategy()) {
        let (old, new) = (v(old), v(new));
        let patch = diff(&new, Some(&old), &ArrayContexts::new());
        let decoded = over_the_wire(&patch);
        prop_assert_eq!(&decoded, &patch);
        prop_assert_eq!(apply_patch(&old, &decoded), new);
    }

    #[test]
    fn untouched_siblings_stay_shared(a in json_strategy(), b in json_strategy(), c in json_strategy()) {
        let old = v(json!({"a": a, "b": b, "pad1": 1, "pad2": 2}));
        let new = apply_patch(
            &old,
            &[Op::Replace { path: vec![PathStep::Key("b".into())], value: v(c) }],
        );
        let (_, applied) = round_trip(&old, &new, &ArrayContexts::new());
        prop_assert!(key(&applied, "a").same(&key(&old, "a")));
        prop_assert_eq!(applied, new);
    }
}
