//! JSON codec for patch operations.
//!
//! Wire shape: `{"op": "add"|"replace"|"remove"|"move", "path": [...],
//! "value"?: any, "from"?: [...]}` where paths are arrays of strings (keys)
//! and non-negative integers (indices). No envelope is added; a patch is a
//! plain JSON array of operation records.

use serde_json::{json, Value as Json};

use crate::patch::types::{Op, Patch, PatchError, PathStep};
use crate::value::Value;

// ── Path helpers ──────────────────────────────────────────────────────────

fn decode_path(obj: &serde_json::Map<String, Json>, key: &str) -> Result<Vec<PathStep>, PatchError> {
    let raw = obj
        .get(key)
        .ok_or_else(|| PatchError::InvalidOp(format!("missing '{key}' field")))?;
    Ok(tree_duplex_path::from_json(raw)?)
}

fn decode_value(obj: &serde_json::Map<String, Json>, op: &str) -> Result<Value, PatchError> {
    obj.get("value")
        .map(|v| Value::from(v.clone()))
        .ok_or_else(|| PatchError::InvalidOp(format!("{op} requires 'value'")))
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize an `Op` to its wire record.
pub fn to_json(op: &Op) -> Json {
    match op {
        Op::Add { path, value } => json!({
            "op": "add",
            "path": tree_duplex_path::to_json(path),
            "value": value.to_json(),
        }),
        Op::Replace { path, value } => json!({
            "op": "replace",
            "path": tree_duplex_path::to_json(path),
            "value": value.to_json(),
        }),
        Op::Remove { path } => json!({
            "op": "remove",
            "path": tree_duplex_path::to_json(path),
        }),
        Op::Move { path, from } => json!({
            "op": "move",
            "path": tree_duplex_path::to_json(path),
            "from": tree_duplex_path::to_json(from),
        }),
    }
}

/// Serialize a whole patch to a JSON array.
pub fn to_json_patch(ops: &[Op]) -> Json {
    Json::Array(ops.iter().map(to_json).collect())
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Deserialize an `Op` from its wire record.
pub fn from_json(v: &Json) -> Result<Op, PatchError> {
    let obj = v
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let op_str = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PatchError::InvalidOp("missing 'op' field".into()))?;
    let path = decode_path(obj, "path")?;

    match op_str {
        "add" => Ok(Op::Add {
            path,
            value: decode_value(obj, op_str)?,
        }),
        "replace" => Ok(Op::Replace {
            path,
            value: decode_value(obj, op_str)?,
        }),
        "remove" => Ok(Op::Remove { path }),
        "move" => Ok(Op::Move {
            path,
            from: decode_path(obj, "from")?,
        }),
        other => Err(PatchError::InvalidOp(format!("unknown op: {other}"))),
    }
}

/// Deserialize a patch from a JSON array of operation records.
pub fn from_json_patch(v: &Json) -> Result<Patch, PatchError> {
    let arr = v
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?;
    arr.iter().map(from_json).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────
