#![allow(dead_code)]

pub mod generators;

use serde_json::Value as Json;
use tree_duplex::patch::{from_json_patch, to_json_patch};
use tree_duplex::{apply_patch, diff, ArrayContexts, Patch, Value};

pub fn v(j: Json) -> Value {
    Value::from(j)
}

/// Diffs `new` against `old` and replays the patch on `old`.
pub fn round_trip(old: &Value, new: &Value, contexts: &ArrayContexts) -> (Patch, Value) {
    let patch = diff(new, Some(old), contexts);
    let applied = apply_patch(old, &patch);
    (patch, applied)
}

/// Sends a patch through its textual wire form, as a channel would.
pub fn over_the_wire(patch: &Patch) -> Patch {
    let text = serde_json::to_string(&to_json_patch(patch))
        .unwrap_or_else(|e| panic!("patch did not encode: {e}"));
    let raw: Json = serde_json::from_str(&text).unwrap_or_else(|e| panic!("bad wire text: {e}"));
    from_json_patch(&raw).unwrap_or_else(|e| panic!("patch did not decode: {e}"))
}

pub fn key(value: &Value, k: &str) -> Value {
    value
        .get_key(k)
        .cloned()
        .unwrap_or_else(|| panic!("missing key {k} in {value}"))
}
