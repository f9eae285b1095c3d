//! Core logic behind the command-line tools:
//! - `tree-diff`: patch between two JSON documents
//! - `tree-patch`: apply a patch to a JSON document

use serde_json::Value as Json;
use tree_duplex_path::{validate_json_pointer, PathPattern};

use crate::patch::apply::apply_patch;
use crate::patch::codec::json::{from_json_patch, to_json_patch};
use crate::patch_diff::{diff_with, ArrayContexts, DiffOptions};
use crate::value::Value;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CliError {
    Json(serde_json::Error),
    Patch(String),
    Context(String),
    Usage(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Json(e)    => write!(f, "{e}"),
            CliError::Patch(e)   => write!(f, "{e}"),
            CliError::Context(e) => write!(f, "Invalid array context: {e}"),
            CliError::Usage(e)   => write!(f, "{e}"),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self { CliError::Json(e) }
}

/// Installs the `RUST_LOG`-driven stderr logger used by the binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

// ── tree-diff ─────────────────────────────────────────────────────────────

/// Parses a `<pointer>=<key>` argument, e.g. `/todos=id` or
/// `/boards/*/cards=uuid`. An empty pointer (`=id`) addresses the root.
pub fn parse_context(arg: &str) -> Result<(PathPattern, String), CliError> {
    let (pointer, key) = arg
        .rsplit_once('=')
        .ok_or_else(|| CliError::Context(format!("expected <pointer>=<key>, got '{arg}'")))?;
    if key.is_empty() {
        return Err(CliError::Context(format!("missing key in '{arg}'")));
    }
    validate_json_pointer(pointer).map_err(|e| CliError::Context(e.to_string()))?;
    Ok((PathPattern::parse(pointer), key.to_string()))
}

/// Computes the patch turning `old_json` into `new_json`.
///
/// `contexts` are `<pointer>=<key>` arguments (see [`parse_context`]).
/// Returns the patch as a pretty-printed JSON array.
pub fn diff_json(old_json: &str, new_json: &str, contexts: &[String]) -> Result<String, CliError> {
    let old = Value::from(serde_json::from_str::<Json>(old_json)?);
    let new = Value::from(serde_json::from_str::<Json>(new_json)?);
    let contexts = contexts
        .iter()
        .map(|arg| parse_context(arg))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .fold(ArrayContexts::new(), |acc, (pattern, key)| acc.with(pattern, key));
    let diff = diff_with((&new).into(), Some(&old), &contexts, &[], &DiffOptions::default());
    Ok(serde_json::to_string_pretty(&to_json_patch(&diff.patch))?)
}

// ── tree-patch ────────────────────────────────────────────────────────────

/// Applies a wire-format patch to a document.
///
/// Returns the patched document as a pretty-printed JSON string.
pub fn apply_json_patch(doc_json: &str, patch_json: &str) -> Result<String, CliError> {
    let doc = Value::from(serde_json::from_str::<Json>(doc_json)?);
    let ops_raw: Json = serde_json::from_str(patch_json)?;
    let ops = from_json_patch(&ops_raw).map_err(|e| CliError::Patch(e.to_string()))?;
    let result = apply_patch(&doc, &ops);
    Ok(serde_json::to_string_pretty(&result.to_json())?)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_scalar_change() {
        let out = diff_json(r#"{"a":1,"b":2,"c":3}"#, r#"{"a":1,"b":5,"c":3}"#, &[]).unwrap();
        let v: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!([{"op": "replace", "path": ["b"], "value": 5}]));
    }

    #[test]
    fn diff_with_context_moves() {
        let out = diff_json(
            r#"[{"id":1},{"id":2},{"id":3}]"#,
            r#"[{"id":1},{"id":3},{"id":2}]"#,
            &["=id".to_string()],
        )
        .unwrap();
        let v: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!([{"op": "move", "path": [1], "from": [2]}]));
    }

    #[test]
    fn context_arguments() {
        let (pattern, key) = parse_context("/boards/*/cards=uuid").unwrap();
        assert_eq!(pattern.len(), 3);
        assert_eq!(key, "uuid");
        assert!(matches!(parse_context("/todos"), Err(CliError::Context(_))));
        assert!(matches!(parse_context("/todos="), Err(CliError::Context(_))));
        assert!(matches!(parse_context("todos=id"), Err(CliError::Context(_))));
    }

    #[test]
    fn patch_round_trip() {
        let old = r#"{"list":[1,2,3],"name":"x"}"#;
        let new = r#"{"list":[1,2,3,4],"name":"x"}"#;
        let patch = diff_json(old, new, &[]).unwrap();
        let out = apply_json_patch(old, &patch).unwrap();
        let v: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(v, serde_json::from_str::<Json>(new).unwrap());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(apply_json_patch("{", "[]"), Err(CliError::Json(_))));
        let err = apply_json_patch("{}", r#"[{"op":"copy","path":[]}]"#).unwrap_err();
        assert!(matches!(err, CliError::Patch(_)));
        assert!(err.to_string().contains("copy"));
    }
}
