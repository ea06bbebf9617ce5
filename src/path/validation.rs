//! Path validation
//!
//! Pure, deterministic checks on path strings. The first failing rule is
//! reported; callers should not rely on seeing every violation.

use crate::error::{EncodeError, PathError};
use crate::path::PathField;

/// Maximum size of a single `/`-delimited component, in UTF-8 bytes
pub const MAX_COMPONENT_BYTES: usize = 255;

/// Maximum size of a whole path, in UTF-8 bytes
pub const MAX_PATH_BYTES: usize = 4096;

/// Characters that are never valid in a filesystem path
pub const RESERVED_CHARACTERS: [char; 8] = ['<', '>', ':', '"', '\\', '|', '?', '*'];

/// Validate a path string.
///
/// Rejects empty or whitespace-only input, `//`, `..`, control characters,
/// anything outside `[A-Za-z0-9/_.-]`, components over 255 bytes and paths
/// over 4096 bytes.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }

    if path.contains("//") {
        return Err(PathError::ConsecutiveSeparators);
    }

    if path.contains("..") {
        return Err(PathError::ParentTraversal);
    }

    if let Some(c) = path.chars().find(|c| is_control_code(*c)) {
        return Err(PathError::ControlCharacter(c as u32));
    }

    // Reserved characters are outside the allowed set too; report the
    // more specific rule for them.
    if let Some(c) = path.chars().find(|c| !is_allowed(*c)) {
        if RESERVED_CHARACTERS.contains(&c) {
            return Err(PathError::ReservedCharacter(c));
        }
        return Err(PathError::DisallowedCharacter(c));
    }

    if let Some(component) = path
        .split('/')
        .find(|component| component.len() > MAX_COMPONENT_BYTES)
    {
        return Err(PathError::ComponentTooLong {
            component: component.to_string(),
            len: component.len(),
        });
    }

    if path.len() > MAX_PATH_BYTES {
        return Err(PathError::PathTooLong(path.len()));
    }

    Ok(())
}

/// Validate a path taken from an operation field, tagging failures with the field
pub fn validate_field(field: PathField, path: &str) -> Result<(), EncodeError> {
    validate_path(path).map_err(|rule| EncodeError::InvalidPath { field, rule })
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.')
}

/// Code points 0-31 and 127
fn is_control_code(c: char) -> bool {
    (c as u32) <= 31 || c as u32 == 127
}
