//! Validation functions for paths.

use thiserror::Error;

use crate::types::PathStep;

/// Maximum allowed pointer string length.
const MAX_POINTER_LENGTH: usize = 1024;

/// Maximum allowed path depth.
const MAX_PATH_LENGTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("POINTER_INVALID")]
    PointerInvalid,
    #[error("POINTER_TOO_LONG")]
    PointerTooLong,
    #[error("Path too long")]
    PathTooLong,
}

/// Validate a JSON Pointer string.
///
/// ```
/// use tree_duplex_path::validate_json_pointer;
///
/// validate_json_pointer("").unwrap();
/// validate_json_pointer("/foo/bar").unwrap();
/// validate_json_pointer("foo").unwrap_err();
/// ```
pub fn validate_json_pointer(pointer: &str) -> Result<(), ValidationError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(ValidationError::PointerInvalid);
    }
    if pointer.len() > MAX_POINTER_LENGTH {
        return Err(ValidationError::PointerTooLong);
    }
    Ok(())
}

/// Validate a decoded path.
///
/// Steps are typed, so the only thing left to check is depth.
pub fn validate_path(path: &[PathStep]) -> Result<(), ValidationError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(ValidationError::PathTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_must_start_with_slash() {
        assert_eq!(validate_json_pointer("a/b"), Err(ValidationError::PointerInvalid));
    }

    #[test]
    fn pointer_length_is_bounded() {
        let long = format!("/{}", "a".repeat(MAX_POINTER_LENGTH));
        assert_eq!(validate_json_pointer(&long), Err(ValidationError::PointerTooLong));
    }

    #[test]
    fn path_depth_is_bounded() {
        let ok = vec![PathStep::Index(0); MAX_PATH_LENGTH];
        assert!(validate_path(&ok).is_ok());
        let deep = vec![PathStep::Index(0); MAX_PATH_LENGTH + 1];
        assert_eq!(validate_path(&deep), Err(ValidationError::PathTooLong));
    }
}
