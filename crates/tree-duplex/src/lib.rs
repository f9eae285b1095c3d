//! tree-duplex: mirror a JSON-shaped state tree between two isolated
//! contexts by shipping structural patches instead of whole values.
//!
//! The producer diffs each new state against the previous one
//! ([`patch_diff`]) and sends the resulting [`Patch`]; the consumer replays it
//! ([`patch::apply_patch`]) so that untouched sub-trees keep their identity.
//! [`duplex`] wraps both ends as consumable continuations, and [`mutable`]
//! provides revisioned wrappers whose revision tells the producer whether a
//! sub-tree needs diffing at all.

pub mod revision;
pub mod value;

pub mod patch;
pub mod patch_diff;

pub mod duplex;
pub mod mutable;

pub mod cli;

pub use duplex::{deserialize, serialize, Deserializer, Serializer};
pub use mutable::{Entry, Input, MutableError, MutableStore, NodeId};
pub use patch::{apply_patch, Op, Patch, PatchError};
pub use patch_diff::{diff, diff_with, ArrayContext, ArrayContexts, Diff, DiffOptions, Diffable, PatchSource};
pub use revision::{Revision, Revisioned};
pub use tree_duplex_path::{Path, PathPattern, PathStep};
pub use value::{Map, Value};
