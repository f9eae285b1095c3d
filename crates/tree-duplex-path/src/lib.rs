//! Paths into JSON-shaped trees.
//!
//! A [`Path`] is a sequence of typed [`PathStep`]s: object keys and array
//! indices. Paths travel on the wire as JSON arrays of strings and numbers
//! (see [`to_json`] / [`from_json`]) and are rendered for humans as JSON
//! Pointers (RFC 6901).
//!
//! # Example
//!
//! ```
//! use tree_duplex_path::{format_json_pointer, parse_json_pointer, PathStep};
//!
//! let path = parse_json_pointer("/users/0/name");
//! assert_eq!(path, vec![
//!     PathStep::Key("users".into()),
//!     PathStep::Index(0),
//!     PathStep::Key("name".into()),
//! ]);
//! assert_eq!(format_json_pointer(&path), "/users/0/name");
//! ```

use serde_json::Value;
use thiserror::Error;

pub mod pattern;
pub mod types;
pub mod validate;

pub use pattern::{PathPattern, PatternStep};
pub use types::{path, Path, PathStep};
pub use validate::{validate_json_pointer, validate_path, ValidationError};

/// Errors from path operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("NO_PARENT")]
    NoParent,
    #[error("path must be an array")]
    NotAnArray,
    #[error("invalid path step: {0}")]
    InvalidStep(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Unescapes a JSON Pointer path component.
///
/// Per RFC 6901, `~1` is replaced with `/` and `~0` is replaced with `~`.
///
/// ```
/// use tree_duplex_path::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~1 must be replaced before ~0
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
///
/// ```
/// use tree_duplex_path::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~ must be escaped before /
    component.replace('~', "~0").replace('/', "~1")
}

/// Parse a JSON Pointer string into typed steps.
///
/// Components that are canonical non-negative integers become
/// [`PathStep::Index`]; everything else is a [`PathStep::Key`]. A pointer
/// without the leading `/` is read relative to the root, so `todos` and
/// `/todos` parse alike.
///
/// ```
/// use tree_duplex_path::{parse_json_pointer, PathStep};
///
/// assert!(parse_json_pointer("").is_empty());
/// assert_eq!(parse_json_pointer("/"), vec![PathStep::Key(String::new())]);
/// assert_eq!(parse_json_pointer("/a~1b/01"), vec![
///     PathStep::Key("a/b".into()),
///     PathStep::Key("01".into()),
/// ]);
/// assert_eq!(parse_json_pointer("todos"), parse_json_pointer("/todos"));
/// ```
pub fn parse_json_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(|component| {
            let component = unescape_component(component);
            if is_valid_index(&component) {
                if let Ok(idx) = component.parse() {
                    return PathStep::Index(idx);
                }
            }
            PathStep::Key(component)
        })
        .collect()
}

/// Format a path as a JSON Pointer string. The root is the empty string.
pub fn format_json_pointer(path: &[PathStep]) -> String {
    let mut out = String::new();
    for step in path {
        out.push('/');
        match step {
            PathStep::Key(k) => out.push_str(&escape_component(k)),
            PathStep::Index(i) => out.push_str(&i.to_string()),
        }
    }
    out
}

/// Check if a path points to the root value.
pub fn is_root(path: &[PathStep]) -> bool {
    path.is_empty()
}

/// Check if `parent` is a proper prefix of `child`.
///
/// ```
/// use tree_duplex_path::{is_child, parse_json_pointer};
///
/// let parent = parse_json_pointer("/foo");
/// let child = parse_json_pointer("/foo/bar");
/// assert!(is_child(&parent, &child));
/// assert!(!is_child(&child, &parent));
/// ```
pub fn is_child(parent: &[PathStep], child: &[PathStep]) -> bool {
    parent.len() < child.len() && starts_with(child, parent)
}

/// Returns `true` if `path` equals `prefix` or descends from it.
pub fn starts_with(path: &[PathStep], prefix: &[PathStep]) -> bool {
    path.len() >= prefix.len() && path[..prefix.len()] == *prefix
}

/// Get the parent path of a given path.
pub fn parent(path: &[PathStep]) -> Result<&[PathStep], PathError> {
    match path.split_last() {
        Some((_, parent)) => Ok(parent),
        None => Err(PathError::NoParent),
    }
}

/// Returns a new path with `prefix` prepended.
pub fn prefixed(prefix: &[PathStep], path: &[PathStep]) -> Path {
    let mut out = Vec::with_capacity(prefix.len() + path.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(path);
    out
}

/// Check if a string represents a canonical non-negative integer index.
///
/// ```
/// use tree_duplex_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|&b| b.is_ascii_digit())
}

/// Encode a path in its wire form: a JSON array of strings and numbers.
pub fn to_json(path: &[PathStep]) -> Value {
    Value::Array(
        path.iter()
            .map(|step| match step {
                PathStep::Key(k) => Value::String(k.clone()),
                PathStep::Index(i) => Value::from(*i),
            })
            .collect(),
    )
}

/// Decode a path from its wire form.
///
/// Numbers must be non-negative integers; strings are always keys, even when
/// they look numeric.
pub fn from_json(value: &Value) -> Result<Path, PathError> {
    let steps = value.as_array().ok_or(PathError::NotAnArray)?;
    let path = steps
        .iter()
        .map(|step| match step {
            Value::String(s) => Ok(PathStep::Key(s.clone())),
            Value::Number(n) => n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .map(PathStep::Index)
                .ok_or_else(|| PathError::InvalidStep(n.to_string())),
            other => Err(PathError::InvalidStep(other.to_string())),
        })
        .collect::<Result<Path, _>>()?;
    validate_path(&path)?;
    Ok(path)
}
