//! Structural diff between two snapshots.
//!
//! The output is deterministic for identical inputs, and `diff(a, a)` is
//! empty. The client relies on that to derive its `dirty` flag.
//!
//! Containers of the same kind are diffed member by member; arrays are
//! compared index-wise, so removals are emitted from the tail first and
//! appends in ascending order. Anything else that differs is a `replace`.

use serde_json::{Map, Value};

use crate::types::{Op, Patch};

// ── Public API ────────────────────────────────────────────────────────────

/// Generates the patch that turns `src` into `dst`.
pub fn diff(src: &Value, dst: &Value) -> Patch {
    let mut ops = Vec::new();
    let mut path = Vec::new();
    diff_at_path(&mut ops, &mut path, src, dst);
    Patch::from(ops)
}

// ── Core recursive differ ─────────────────────────────────────────────────

fn diff_at_path(ops: &mut Vec<Op>, path: &mut Vec<String>, src: &Value, dst: &Value) {
    if src == dst {
        return;
    }
    match (src, dst) {
        (Value::Object(s), Value::Object(d)) => diff_obj(ops, path, s, d),
        (Value::Array(s), Value::Array(d)) => diff_arr(ops, path, s, d),
        _ => ops.push(Op::Replace { path: path.clone(), value: dst.clone() }),
    }
}

fn with_step<F: FnOnce(&mut Vec<String>)>(path: &mut Vec<String>, step: String, f: F) {
    path.push(step);
    f(path);
    path.pop();
}

fn diff_obj(ops: &mut Vec<Op>, path: &mut Vec<String>, src: &Map<String, Value>, dst: &Map<String, Value>) {
    for (key, src_val) in src.iter().rev() {
        with_step(path, key.clone(), |p| match dst.get(key) {
            Some(dst_val) => diff_at_path(ops, p, src_val, dst_val),
            None => ops.push(Op::Remove { path: p.clone() }),
        });
    }
    for (key, dst_val) in dst {
        if !src.contains_key(key) {
            with_step(path, key.clone(), |p| {
                ops.push(Op::Add { path: p.clone(), value: dst_val.clone() })
            });
        }
    }
}

fn diff_arr(ops: &mut Vec<Op>, path: &mut Vec<String>, src: &[Value], dst: &[Value]) {
    for idx in (0..src.len()).rev() {
        with_step(path, idx.to_string(), |p| match dst.get(idx) {
            Some(dst_val) => diff_at_path(ops, p, &src[idx], dst_val),
            None => ops.push(Op::Remove { path: p.clone() }),
        });
    }
    for (idx, dst_val) in dst.iter().enumerate().skip(src.len()) {
        with_step(path, idx.to_string(), |p| {
            ops.push(Op::Add { path: p.clone(), value: dst_val.clone() })
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
