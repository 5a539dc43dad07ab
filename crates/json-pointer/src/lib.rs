//! JSON Pointer (RFC 6901) paths for deck snapshots.
//!
//! Every patch operation addresses its target with a pointer such as
//! `/files/cards~1back.png`. This crate parses those strings into [`Path`]s,
//! formats them back, and walks a `serde_json::Value` tree along a path.
//!
//! # Example
//!
//! ```
//! use deckscribe_json_pointer::{format_json_pointer, get, parse_json_pointer};
//!
//! let path = parse_json_pointer("/files/a~1b");
//! assert_eq!(path, vec!["files".to_string(), "a/b".to_string()]);
//! assert_eq!(format_json_pointer(&path), "/files/a~1b");
//!
//! let doc = serde_json::json!({"files": {"a/b": 1}});
//! assert_eq!(get(&doc, &path), Some(&serde_json::json!(1)));
//! ```

use thiserror::Error;

pub mod get;
pub mod types;
pub mod util;
pub mod validate;

pub use get::{get, get_mut, resolve_index};
pub use types::{Path, PathStep};
pub use util::{
    escape_component, format_json_pointer, is_child, is_root, is_valid_index,
    parse_json_pointer, split_last, unescape_component,
};
pub use validate::{validate_json_pointer, validate_path};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonPointerError {
    #[error("NOT_FOUND")]
    NotFound,
    #[error("INVALID_INDEX")]
    InvalidIndex,
    #[error("POINTER_INVALID")]
    PointerInvalid,
    #[error("POINTER_TOO_LONG")]
    PointerTooLong,
    #[error("PATH_TOO_LONG")]
    PathTooLong,
}
