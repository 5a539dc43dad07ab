//! JSON Patch (RFC 6902) for deck snapshots.
//!
//! A patch is an ordered list of [`Op`]s. [`diff`] computes one between two
//! snapshots, [`apply_patch`] applies one strictly (the server's path) and
//! [`apply_patch_lenient`] applies one best-effort (the client's rebase
//! path, where an edit to a field the server no longer has is dropped).
//!
//! # Operations
//!
//! `add`, `remove`, `replace`, `move`, `copy`, `test`.
//!
//! ```
//! use deckscribe_json_patch::{apply_patch, diff, ApplyOptions};
//! use serde_json::json;
//!
//! let a = json!({"name": "A"});
//! let b = json!({"name": "B", "count": 5});
//! let patch = diff(&a, &b);
//!
//! let mut doc = a.clone();
//! apply_patch(&mut doc, &patch, &ApplyOptions::default()).unwrap();
//! assert_eq!(doc, b);
//! ```

pub mod apply;
pub mod codec;
pub mod diff;
pub mod types;

pub use apply::{apply_op, apply_patch, apply_patch_lenient, LenientResult};
pub use codec::{from_json, from_json_patch, to_json, to_json_patch};
pub use diff::diff;
pub use types::{ApplyOptions, Op, Patch, PatchApplyError, PatchError};
