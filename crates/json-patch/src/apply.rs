//! Patch application.
//!
//! [`apply_patch`] stops at the first failing operation; the document store
//! uses it so a patch either lands completely or not at all.
//! [`apply_patch_lenient`] skips failing operations instead; the client uses
//! it to replay local edits onto a newer snapshot.

use std::borrow::Cow;

use deckscribe_json_pointer::{get, get_mut, is_child, is_root, resolve_index, split_last, validate_path};
use serde_json::Value;

use crate::types::{ApplyOptions, Op, Patch, PatchApplyError, PatchError};

// ── Path navigation ───────────────────────────────────────────────────────

fn parent_mut<'a>(doc: &'a mut Value, parent_path: &[String]) -> Result<&'a mut Value, PatchError> {
    get_mut(doc, parent_path).ok_or(PatchError::NotFound)
}

// ── Individual operation applicators ─────────────────────────────────────

fn apply_add(doc: &mut Value, path: &[String], value: Value) -> Result<(), PatchError> {
    let Some((parent_path, key)) = split_last(path) else {
        *doc = value;
        return Ok(());
    };
    match parent_mut(doc, parent_path)? {
        Value::Object(map) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let idx = resolve_index(key, arr.len(), true).map_err(|_| PatchError::InvalidIndex)?;
            arr.insert(idx, value);
            Ok(())
        }
        _ => Err(PatchError::InvalidTarget),
    }
}

fn apply_remove(doc: &mut Value, path: &[String]) -> Result<Value, PatchError> {
    let (parent_path, key) = split_last(path).ok_or(PatchError::InvalidTarget)?;
    match parent_mut(doc, parent_path)? {
        Value::Object(map) => map.shift_remove(key).ok_or(PatchError::NotFound),
        Value::Array(arr) => {
            let idx = resolve_index(key, arr.len(), false)?;
            Ok(arr.remove(idx))
        }
        _ => Err(PatchError::InvalidTarget),
    }
}

fn apply_replace(doc: &mut Value, path: &[String], value: Value) -> Result<(), PatchError> {
    let target = get_mut(doc, path).ok_or(PatchError::NotFound)?;
    *target = value;
    Ok(())
}

fn apply_copy(doc: &mut Value, path: &[String], from: &[String]) -> Result<(), PatchError> {
    let src = get(doc, from).ok_or(PatchError::NotFound)?.clone();
    apply_add(doc, path, src)
}

fn apply_move(doc: &mut Value, path: &[String], from: &[String]) -> Result<(), PatchError> {
    if path == from {
        return get(doc, from).map(|_| ()).ok_or(PatchError::NotFound);
    }
    if is_child(from, path) {
        return Err(PatchError::InvalidTarget);
    }
    let value = apply_remove(doc, from)?;
    if let Err(err) = apply_add(doc, path, value.clone()) {
        // put the value back so a failed move never loses data
        apply_add(doc, from, value)?;
        return Err(err);
    }
    Ok(())
}

fn apply_test(doc: &Value, path: &[String], value: &Value) -> Result<(), PatchError> {
    let actual = get(doc, path).ok_or(PatchError::NotFound)?;
    if actual == value {
        Ok(())
    } else {
        Err(PatchError::Test)
    }
}

// ── Validation ────────────────────────────────────────────────────────────

/// Checks that the container an `add` writes into exists and accepts the key.
fn check_insert_target(doc: &Value, path: &[String]) -> Result<(), PatchError> {
    let Some((parent_path, key)) = split_last(path) else {
        return Ok(());
    };
    match get(doc, parent_path) {
        Some(Value::Object(_)) => Ok(()),
        Some(Value::Array(arr)) => {
            resolve_index(key, arr.len(), true).map_err(|_| PatchError::InvalidIndex)?;
            Ok(())
        }
        Some(_) => Err(PatchError::InvalidTarget),
        None => Err(PatchError::NotFound),
    }
}

fn check_existing(doc: &Value, path: &[String]) -> Result<(), PatchError> {
    get(doc, path).map(|_| ()).ok_or(PatchError::NotFound)
}

/// Validates `op` against the current intermediate document without
/// touching it.
pub fn validate_op(doc: &Value, op: &Op) -> Result<(), PatchError> {
    validate_path(op.path())?;
    if let Some(from) = op.from() {
        validate_path(from)?;
    }
    match op {
        Op::Add { path, .. } => check_insert_target(doc, path),
        Op::Remove { path } => {
            if is_root(path) {
                return Err(PatchError::InvalidTarget);
            }
            check_existing(doc, path)
        }
        Op::Replace { path, .. } | Op::Test { path, .. } => check_existing(doc, path),
        Op::Copy { path, from } => {
            check_existing(doc, from)?;
            check_insert_target(doc, path)
        }
        Op::Move { path, from } => {
            check_existing(doc, from)?;
            if is_child(from, path) {
                return Err(PatchError::InvalidTarget);
            }
            check_insert_target(doc, path)
        }
    }
}

// ── Main apply functions ──────────────────────────────────────────────────

/// Applies a single operation in place.
pub fn apply_op(doc: &mut Value, op: &Op) -> Result<(), PatchError> {
    match op {
        Op::Add { path, value } => apply_add(doc, path, value.clone()),
        Op::Remove { path } => apply_remove(doc, path).map(|_| ()),
        Op::Replace { path, value } => apply_replace(doc, path, value.clone()),
        Op::Copy { path, from } => apply_copy(doc, path, from),
        Op::Move { path, from } => apply_move(doc, path, from),
        Op::Test { path, value } => apply_test(doc, path, value),
    }
}

fn apply_ops(doc: &mut Value, patch: &Patch, validate: bool) -> Result<(), PatchApplyError> {
    for (op_index, op) in patch.iter().enumerate() {
        let step = if validate {
            validate_op(doc, op).and_then(|_| apply_op(doc, op))
        } else {
            apply_op(doc, op)
        };
        step.map_err(|reason| PatchApplyError { op_index, reason })?;
    }
    Ok(())
}

/// Applies `patch` to `doc`, failing on the first operation that does not
/// fit.
///
/// With `mutate: false` the document is left untouched on failure.
pub fn apply_patch(doc: &mut Value, patch: &Patch, options: &ApplyOptions) -> Result<(), PatchApplyError> {
    if options.mutate {
        return apply_ops(doc, patch, options.validate);
    }
    let mut working = doc.clone();
    apply_ops(&mut working, patch, options.validate)?;
    *doc = working;
    Ok(())
}

/// Result of [`apply_patch_lenient`].
#[derive(Debug, Clone, PartialEq)]
pub struct LenientResult {
    pub doc: Value,
    /// Operations that did not fit and were dropped, in patch order.
    pub skipped: Vec<PatchApplyError>,
}

/// An `add` past the end of an array that still exists becomes an append.
fn clamp_array_add<'a>(doc: &Value, op: &'a Op) -> Cow<'a, Op> {
    let Op::Add { path, value } = op else {
        return Cow::Borrowed(op);
    };
    let Some((parent_path, key)) = split_last(path) else {
        return Cow::Borrowed(op);
    };
    match (get(doc, parent_path), key.parse::<usize>()) {
        (Some(Value::Array(arr)), Ok(idx)) if idx > arr.len() => {
            let mut path = parent_path.to_vec();
            path.push(arr.len().to_string());
            Cow::Owned(Op::Add { path, value: value.clone() })
        }
        _ => Cow::Borrowed(op),
    }
}

/// Applies every operation of `patch` that fits and drops the rest.
///
/// Each operation is validated first, so a dropped operation never leaves a
/// half-applied change behind. Array insertions past the end are appended,
/// so only operations whose target container is gone get dropped.
pub fn apply_patch_lenient(doc: &Value, patch: &Patch) -> LenientResult {
    let mut working = doc.clone();
    let mut skipped = Vec::new();
    for (op_index, op) in patch.iter().enumerate() {
        let op = clamp_array_add(&working, op);
        if let Err(reason) = validate_op(&working, &op).and_then(|_| apply_op(&mut working, &op)) {
            skipped.push(PatchApplyError { op_index, reason });
        }
    }
    LenientResult { doc: working, skipped }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

use deckscribe_json_pointer::parse_json_pointer as path;
    use serde_json::json;

    fn patch(ops: Vec<Op>) -> Patch {
        Patch::from(ops)
    }

    #[test]
    fn add_to_object() {
        let mut doc = json!({"a": 1});
        apply_op(&mut doc, &Op::Add { path: path("/b"), value: json!(2) }).unwrap();
        assert_eq!(doc, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn add_to_array_and_append() {
        let mut doc = json!([1, 2, 3]);
        apply_op(&mut doc, &Op::Add { path: path("/1"), value: json!(99) }).unwrap();
        apply_op(&mut doc, &Op::Add { path: path("/-"), value: json!(4) }).unwrap();
        assert_eq!(doc, json!([1, 99, 2, 3, 4]));
    }

    #[test]
    fn add_past_end_of_array_fails() {
        let mut doc = json!([1]);
        let err = apply_op(&mut doc, &Op::Add { path: path("/5"), value: json!(0) });
        assert_eq!(err, Err(PatchError::InvalidIndex));
    }

    #[test]
    fn add_at_root_replaces_document() {
        let mut doc = json!({"a": 1});
        apply_op(&mut doc, &Op::Add { path: path(""), value: json!([1]) }).unwrap();
        assert_eq!(doc, json!([1]));
    }

    #[test]
    fn remove_keeps_key_order() {
        let mut doc = json!({"a": 1, "b": 2, "c": 3});
        apply_op(&mut doc, &Op::Remove { path: path("/a") }).unwrap();
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn remove_missing_fails() {
        let mut doc = json!({"a": 1});
        assert_eq!(apply_op(&mut doc, &Op::Remove { path: path("/z") }), Err(PatchError::NotFound));
        assert_eq!(apply_op(&mut doc, &Op::Remove { path: path("") }), Err(PatchError::InvalidTarget));
    }

    #[test]
    fn replace_requires_existing_target() {
        let mut doc = json!({"name": "A"});
        apply_op(&mut doc, &Op::Replace { path: path("/name"), value: json!("B") }).unwrap();
        assert_eq!(doc, json!({"name": "B"}));
        let err = apply_op(&mut doc, &Op::Replace { path: path("/count"), value: json!(1) });
        assert_eq!(err, Err(PatchError::NotFound));
    }

    #[test]
    fn copy_and_move() {
        let mut doc = json!({"a": {"x": 1}, "b": {}});
        apply_op(&mut doc, &Op::Copy { path: path("/b/x"), from: path("/a/x") }).unwrap();
        assert_eq!(doc, json!({"a": {"x": 1}, "b": {"x": 1}}));
        apply_op(&mut doc, &Op::Move { path: path("/c"), from: path("/a") }).unwrap();
        assert_eq!(doc, json!({"b": {"x": 1}, "c": {"x": 1}}));
    }

    #[test]
    fn move_into_own_child_fails() {
        let mut doc = json!({"a": {"b": {}}});
        let err = apply_op(&mut doc, &Op::Move { path: path("/a/b/c"), from: path("/a") });
        assert_eq!(err, Err(PatchError::InvalidTarget));
        assert_eq!(doc, json!({"a": {"b": {}}}));
    }

    #[test]
    fn failed_move_restores_source() {
        let mut doc = json!({"a": 1, "s": "scalar"});
        let err = apply_op(&mut doc, &Op::Move { path: path("/s/x"), from: path("/a") });
        assert_eq!(err, Err(PatchError::InvalidTarget));
        assert_eq!(doc["a"], json!(1));
    }

    #[test]
    fn test_op() {
        let mut doc = json!({"a": 42});
        apply_op(&mut doc, &Op::Test { path: path("/a"), value: json!(42) }).unwrap();
        let err = apply_op(&mut doc, &Op::Test { path: path("/a"), value: json!(1) });
        assert_eq!(err, Err(PatchError::Test));
    }

    #[test]
    fn strict_apply_is_atomic_without_mutate() {
        let mut doc = json!({"name": "A"});
        let p = patch(vec![
            Op::Replace { path: path("/name"), value: json!("B") },
            Op::Test { path: path("/name"), value: json!("A") },
        ]);
        let err = apply_patch(&mut doc, &p, &ApplyOptions::strict()).unwrap_err();
        assert_eq!(err, PatchApplyError { op_index: 1, reason: PatchError::Test });
        assert_eq!(doc, json!({"name": "A"}));
    }

    #[test]
    fn mutate_leaves_partial_result() {
        let mut doc = json!({"name": "A"});
        let p = patch(vec![
            Op::Replace { path: path("/name"), value: json!("B") },
            Op::Remove { path: path("/missing") },
        ]);
        let options = ApplyOptions { mutate: true, validate: false };
        let err = apply_patch(&mut doc, &p, &options).unwrap_err();
        assert_eq!(err.op_index, 1);
        assert_eq!(doc, json!({"name": "B"}));
    }

    #[test]
    fn validate_reports_scalar_parent() {
        let doc = json!({"name": "A"});
        let op = Op::Add { path: path("/name/first"), value: json!(1) };
        assert_eq!(validate_op(&doc, &op), Err(PatchError::InvalidTarget));
        let op = Op::Add { path: path("/missing/first"), value: json!(1) };
        assert_eq!(validate_op(&doc, &op), Err(PatchError::NotFound));
    }

    #[test]
    fn lenient_skips_missing_paths() {
        let doc = json!({"name": "B"});
        let p = patch(vec![
            Op::Replace { path: path("/files/a.png/width"), value: json!(10) },
            Op::Add { path: path("/count"), value: json!(5) },
        ]);
        let result = apply_patch_lenient(&doc, &p);
        assert_eq!(result.doc, json!({"name": "B", "count": 5}));
        assert_eq!(
            result.skipped,
            vec![PatchApplyError { op_index: 0, reason: PatchError::NotFound }]
        );
    }

    #[test]
    fn lenient_appends_past_the_end_of_a_shorter_array() {
        let doc = json!({"tags": ["a"]});
        let p = patch(vec![Op::Add { path: path("/tags/2"), value: json!("c") }]);
        let result = apply_patch_lenient(&doc, &p);
        assert_eq!(result.doc, json!({"tags": ["a", "c"]}));
        assert!(result.skipped.is_empty());

        let mut strict = doc.clone();
        assert!(apply_patch(&mut strict, &p, &ApplyOptions::strict()).is_err());
    }
}
