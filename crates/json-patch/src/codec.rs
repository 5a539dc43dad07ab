//! JSON codec for patch operations.
//!
//! Converts operations to and from RFC 6902 objects such as
//! `{"op": "replace", "path": "/name", "value": "B"}`. [`Patch`] serializes
//! through this codec, so HTTP bodies decode straight into it.

use deckscribe_json_pointer::{format_json_pointer, parse_json_pointer, validate_json_pointer};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::types::{Op, Patch, PatchError};

// ── Path helpers ──────────────────────────────────────────────────────────

fn encode_path(path: &[String]) -> Value {
    Value::String(format_json_pointer(path))
}

fn decode_path(map: &Map<String, Value>, field: &str) -> Result<Vec<String>, PatchError> {
    let pointer = map
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp(format!("\"{field}\" must be a string")))?;
    validate_json_pointer(pointer)?;
    Ok(parse_json_pointer(pointer))
}

fn decode_value(map: &Map<String, Value>) -> Result<Value, PatchError> {
    map.get("value")
        .cloned()
        .ok_or_else(|| PatchError::InvalidOp("missing \"value\"".into()))
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serializes an operation to its RFC 6902 object.
pub fn to_json(op: &Op) -> Value {
    let mut map = Map::new();
    map.insert("op".into(), Value::from(op.op_name()));
    map.insert("path".into(), encode_path(op.path()));
    match op {
        Op::Add { value, .. } | Op::Replace { value, .. } | Op::Test { value, .. } => {
            map.insert("value".into(), value.clone());
        }
        Op::Move { from, .. } | Op::Copy { from, .. } => {
            map.insert("from".into(), encode_path(from));
        }
        Op::Remove { .. } => {}
    }
    Value::Object(map)
}

pub fn to_json_patch(patch: &Patch) -> Value {
    Value::Array(patch.iter().map(to_json).collect())
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Decodes one RFC 6902 operation object.
pub fn from_json(value: &Value) -> Result<Op, PatchError> {
    let map = value
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let name = map
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("missing \"op\"".into()))?;
    let path = decode_path(map, "path")?;
    let op = match name {
        "add" => Op::Add { path, value: decode_value(map)? },
        "remove" => Op::Remove { path },
        "replace" => Op::Replace { path, value: decode_value(map)? },
        "move" => Op::Move { path, from: decode_path(map, "from")? },
        "copy" => Op::Copy { path, from: decode_path(map, "from")? },
        "test" => Op::Test { path, value: decode_value(map)? },
        other => return Err(PatchError::InvalidOp(format!("unknown op \"{other}\""))),
    };
    Ok(op)
}

/// Decodes a patch array. Errors name the index of the offending operation.
pub fn from_json_patch(value: &Value) -> Result<Patch, PatchError> {
    let arr = value
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?;
    arr.iter()
        .enumerate()
        .map(|(i, op)| {
            from_json(op).map_err(|e| {
                PatchError::InvalidOp(format!("Error in operation [index = {i}] ({e})."))
            })
        })
        .collect()
}

impl Serialize for Patch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json_patch(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Patch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_json_patch(&value).map_err(D::Error::custom)
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_json(&value).map_err(D::Error::custom)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
