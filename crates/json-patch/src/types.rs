//! Core types for the patch codec.

use std::ops::Deref;

use serde_json::Value;
use thiserror::Error;

pub use deckscribe_json_pointer::Path;

// ── Error ─────────────────────────────────────────────────────────────────

/// Why a single operation could not be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("NOT_FOUND")]
    NotFound,
    #[error("TEST")]
    Test,
    #[error("INVALID_INDEX")]
    InvalidIndex,
    #[error("INVALID_TARGET")]
    InvalidTarget,
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
}

impl From<deckscribe_json_pointer::JsonPointerError> for PatchError {
    fn from(err: deckscribe_json_pointer::JsonPointerError) -> Self {
        use deckscribe_json_pointer::JsonPointerError as E;
        match err {
            E::NotFound => PatchError::NotFound,
            E::InvalidIndex => PatchError::InvalidIndex,
            other => PatchError::InvalidOp(other.to_string()),
        }
    }
}

/// A patch that does not fit the snapshot it was applied to.
///
/// This is not a corrupt patch: it usually means the target changed after
/// the patch was computed. Callers treat it as recoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("operation [index = {op_index}] failed ({reason})")]
pub struct PatchApplyError {
    pub op_index: usize,
    pub reason: PatchError,
}

// ── Op enum ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Replace { path: Path, value: Value },
    Move { path: Path, from: Path },
    Copy { path: Path, from: Path },
    Test { path: Path, value: Value },
}

impl Op {
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Remove { .. } => "remove",
            Op::Replace { .. } => "replace",
            Op::Move { .. } => "move",
            Op::Copy { .. } => "copy",
            Op::Test { .. } => "test",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Op::Add { path, .. }
            | Op::Remove { path }
            | Op::Replace { path, .. }
            | Op::Move { path, .. }
            | Op::Copy { path, .. }
            | Op::Test { path, .. } => path,
        }
    }

    /// Source path of `move` and `copy`.
    pub fn from(&self) -> Option<&Path> {
        match self {
            Op::Move { from, .. } | Op::Copy { from, .. } => Some(from),
            _ => None,
        }
    }
}

// ── Patch ─────────────────────────────────────────────────────────────────

/// An ordered sequence of operations. Order matters: each operation sees the
/// document as left by the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch(pub Vec<Op>);

impl Patch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, op: Op) {
        self.0.push(op);
    }
}

impl Deref for Patch {
    type Target = [Op];

    fn deref(&self) -> &[Op] {
        &self.0
    }
}

impl From<Vec<Op>> for Patch {
    fn from(ops: Vec<Op>) -> Self {
        Self(ops)
    }
}

impl FromIterator<Op> for Patch {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Patch {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ── Options ───────────────────────────────────────────────────────────────

/// Options for [`apply_patch`](crate::apply_patch).
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Apply in place. A failure part-way leaves earlier operations applied.
    /// When false the patch is applied to a copy that only replaces the
    /// document once every operation succeeded.
    pub mutate: bool,
    /// Check each operation against the intermediate tree before applying it.
    pub validate: bool,
}

impl ApplyOptions {
    /// Atomic, validated application. What the document store uses.
    pub fn strict() -> Self {
        Self { mutate: false, validate: true }
    }
}
