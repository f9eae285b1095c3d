//! Core types for the patch module.

use std::fmt;

use thiserror::Error;
use tree_duplex_path::{format_json_pointer, PathError};

use crate::value::Value;

pub use tree_duplex_path::{Path, PathStep};

// ── Error ─────────────────────────────────────────────────────────────────

/// Raised only for malformed wire records. Applying a well-formed patch never
/// fails.
#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
    #[error("INVALID_PATH: {0}")]
    InvalidPath(#[from] PathError),
}

// ── Op enum ───────────────────────────────────────────────────────────────

/// A patch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `path` does not exist in the base; `value` is inserted. Array targets
    /// shift later elements up.
    Add { path: Path, value: Value },
    /// `path` exists; its value is replaced wholesale.
    Replace { path: Path, value: Value },
    /// `path` exists and is deleted. Array targets shift later elements down.
    Remove { path: Path },
    /// Relocates an array element. `from` and `path` name positions in the
    /// same array.
    Move { path: Path, from: Path },
}

/// An ordered list of operations.
pub type Patch = Vec<Op>;

impl Op {
    /// Returns the operation name as written on the wire.
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Replace { .. } => "replace",
            Op::Remove { .. } => "remove",
            Op::Move { .. } => "move",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Op::Add { path, .. } => path,
            Op::Replace { path, .. } => path,
            Op::Remove { path } => path,
            Op::Move { path, .. } => path,
        }
    }

    /// Rebases the operation under `prefix`. Both `path` and `from` move.
    pub fn prefixed(&self, prefix: &[PathStep]) -> Op {
        let rebase = |p: &Path| tree_duplex_path::prefixed(prefix, p);
        match self {
            Op::Add { path, value } => Op::Add {
                path: rebase(path),
                value: value.clone(),
            },
            Op::Replace { path, value } => Op::Replace {
                path: rebase(path),
                value: value.clone(),
            },
            Op::Remove { path } => Op::Remove { path: rebase(path) },
            Op::Move { path, from } => Op::Move {
                path: rebase(path),
                from: rebase(from),
            },
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = format_json_pointer(self.path());
        match self {
            Op::Move { from, .. } => {
                write!(f, "move {} -> {}", format_json_pointer(from), pointer)
            }
            other => write!(f, "{} {}", other.op_name(), pointer),
        }
    }
}
