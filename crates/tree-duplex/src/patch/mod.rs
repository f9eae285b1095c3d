//! Patches: ordered lists of `add` / `replace` / `remove` / `move`
//! operations over a [`Value`](crate::value::Value) tree.
//!
//! [`apply_patch`] replays a patch with structural sharing; the [`codec`]
//! module converts patches to and from their JSON wire form.

pub mod apply;
pub mod codec;
pub mod types;
pub mod util;

pub use apply::{apply_op, apply_patch};
pub use codec::json::{from_json, from_json_patch, to_json, to_json_patch};
pub use types::{Op, Patch, PatchError};
