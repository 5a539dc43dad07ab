use serde_json::Value;

use crate::util::is_valid_index;
use crate::JsonPointerError;

/// Resolves an array step against an array of `len` elements.
///
/// `"-"` resolves to `len` (one past the end) only when `allow_end` is set,
/// which is what `add` needs. Every other position must be a canonical index
/// no larger than `len` (with `allow_end`) or strictly below it.
pub fn resolve_index(step: &str, len: usize, allow_end: bool) -> Result<usize, JsonPointerError> {
    if step == "-" {
        return if allow_end { Ok(len) } else { Err(JsonPointerError::NotFound) };
    }
    if !is_valid_index(step) {
        return Err(JsonPointerError::InvalidIndex);
    }
    let idx: usize = step.parse().map_err(|_| JsonPointerError::InvalidIndex)?;
    let limit = if allow_end { len } else { len.saturating_sub(1) };
    if idx > limit || (!allow_end && len == 0) {
        return Err(JsonPointerError::NotFound);
    }
    Ok(idx)
}

/// Returns the value at `path`, or `None` when any step is missing.
pub fn get<'a>(val: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => arr.get(resolve_index(step, arr.len(), false).ok()?)?,
            Value::Object(map) => map.get(step)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable counterpart of [`get`].
pub fn get_mut<'a>(val: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => {
                let idx = resolve_index(step, arr.len(), false).ok()?;
                arr.get_mut(idx)?
            }
            Value::Object(map) => map.get_mut(step)?,
            _ => return None,
        };
    }
    Some(current)
}
