//! Limits applied to pointers arriving from untrusted clients.

use crate::JsonPointerError;

const MAX_POINTER_LENGTH: usize = 1024;

const MAX_PATH_LENGTH: usize = 256;

/// Validates a pointer string.
///
/// ```
/// use deckscribe_json_pointer::validate_json_pointer;
///
/// validate_json_pointer("").unwrap();
/// validate_json_pointer("/scriptText").unwrap();
/// validate_json_pointer("scriptText").unwrap_err();
/// ```
pub fn validate_json_pointer(pointer: &str) -> Result<(), JsonPointerError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(JsonPointerError::PointerInvalid);
    }
    if pointer.len() > MAX_POINTER_LENGTH {
        return Err(JsonPointerError::PointerTooLong);
    }
    Ok(())
}

pub fn validate_path(path: &[String]) -> Result<(), JsonPointerError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(JsonPointerError::PathTooLong);
    }
    Ok(())
}
