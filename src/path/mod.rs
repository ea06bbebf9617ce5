//! Path validation
//!
//! Enforces the syntactic rules every path must satisfy before it is encoded
//! into a command payload.

pub mod validation;

use std::fmt;

pub use validation::{
    MAX_COMPONENT_BYTES, MAX_PATH_BYTES, RESERVED_CHARACTERS, validate_field, validate_path,
};

/// Names the operation field a path came from, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathField {
    Path,
    Name,
    JoinedPath,
    OldPath,
    NewPath,
    SrcPath,
    DestPath,
}

impl fmt::Display for PathField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathField::Path => "path",
            PathField::Name => "name",
            PathField::JoinedPath => "joined path",
            PathField::OldPath => "oldPath",
            PathField::NewPath => "newPath",
            PathField::SrcPath => "srcPath",
            PathField::DestPath => "destPath",
        };
        f.write_str(name)
    }
}
