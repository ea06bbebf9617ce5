//! Operation model
//!
//! Typed descriptions of the file-system actions a client can request, plus the
//! identifiers they carry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;
use crate::path::PathField;

/// Identifier scoping every path to one remote file system instance.
///
/// Holds the caller's decimal spelling; the range check happens in
/// [`FilesystemId::value`] right before the fixed-width encode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilesystemId(String);

impl FilesystemId {
    pub fn new(decimal: impl Into<String>) -> Self {
        Self(decimal.into())
    }

    /// Returns the decimal string as supplied
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse and range-check the identifier.
    ///
    /// Accepts any number of decimal digits (leading zeros included) whose
    /// value is at most 2^64-1. Signs, whitespace and empty input are rejected.
    pub fn value(&self) -> Result<u64, EncodeError> {
        let invalid = || EncodeError::InvalidFilesystemId(self.0.clone());

        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // Overflow surfaces as an error instead of wrapping or truncating
        self.0.parse::<u64>().map_err(|_| invalid())
    }
}

impl From<u64> for FilesystemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for FilesystemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FilesystemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for FilesystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a data blob transferred out of band for write operations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataReference(String);

impl DataReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leading payload byte selecting the operation.
///
/// Values are fixed by the server-side interpreter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Discriminator {
    Initialize = 0,
    DestroyAll = 1,
    CreateFile = 2,
    Peek = 3,
    Poke = 4,
    RemoveFile = 5,
    CreateDirectory = 6,
    RemoveDirectory = 7,
    RenamePath = 8,
    CopyPath = 9,
    Move = 10,
}

impl Discriminator {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        let discriminator = match byte {
            0 => Discriminator::Initialize,
            1 => Discriminator::DestroyAll,
            2 => Discriminator::CreateFile,
            3 => Discriminator::Peek,
            4 => Discriminator::Poke,
            5 => Discriminator::RemoveFile,
            6 => Discriminator::CreateDirectory,
            7 => Discriminator::RemoveDirectory,
            8 => Discriminator::RenamePath,
            9 => Discriminator::CopyPath,
            10 => Discriminator::Move,
            _ => return None,
        };
        Some(discriminator)
    }
}

/// One file-system action to perform remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Operation {
    Initialize,
    DestroyAll {
        fsid: FilesystemId,
    },
    CreateFile {
        fsid: FilesystemId,
        path: String,
        name: String,
    },
    CreateDirectory {
        fsid: FilesystemId,
        path: String,
        name: String,
    },
    RemoveFile {
        fsid: FilesystemId,
        path: String,
    },
    RemoveDirectory {
        fsid: FilesystemId,
        path: String,
    },
    RenamePath {
        fsid: FilesystemId,
        old_path: String,
        new_path: String,
    },
    CopyPath {
        fsid: FilesystemId,
        src_path: String,
        dest_path: String,
    },
    Move {
        fsid: FilesystemId,
        src_path: String,
        dest_path: String,
        name: String,
    },
    Peek {
        fsid: FilesystemId,
        path: String,
        start_offset: u64,
        end_offset: u64,
    },
    Poke {
        fsid: FilesystemId,
        path: String,
        offset: u64,
        data_ref: DataReference,
    },
}

impl Operation {
    /// Parse an operation from its JSON form, e.g. `{"op":"initialize"}`
    pub fn from_json(text: &str) -> Result<Operation, EncodeError> {
        serde_json::from_str(text).map_err(|e| EncodeError::MalformedOperation(e.to_string()))
    }

    pub fn discriminator(&self) -> Discriminator {
        match self {
            Operation::Initialize => Discriminator::Initialize,
            Operation::DestroyAll { .. } => Discriminator::DestroyAll,
            Operation::CreateFile { .. } => Discriminator::CreateFile,
            Operation::CreateDirectory { .. } => Discriminator::CreateDirectory,
            Operation::RemoveFile { .. } => Discriminator::RemoveFile,
            Operation::RemoveDirectory { .. } => Discriminator::RemoveDirectory,
            Operation::RenamePath { .. } => Discriminator::RenamePath,
            Operation::CopyPath { .. } => Discriminator::CopyPath,
            Operation::Move { .. } => Discriminator::Move,
            Operation::Peek { .. } => Discriminator::Peek,
            Operation::Poke { .. } => Discriminator::Poke,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::DestroyAll { .. } => "destroyAll",
            Operation::CreateFile { .. } => "createFile",
            Operation::CreateDirectory { .. } => "createDirectory",
            Operation::RemoveFile { .. } => "removeFile",
            Operation::RemoveDirectory { .. } => "removeDirectory",
            Operation::RenamePath { .. } => "renamePath",
            Operation::CopyPath { .. } => "copyPath",
            Operation::Move { .. } => "move",
            Operation::Peek { .. } => "peek",
            Operation::Poke { .. } => "poke",
        }
    }

    pub fn fsid(&self) -> Option<&FilesystemId> {
        match self {
            Operation::Initialize => None,
            Operation::DestroyAll { fsid }
            | Operation::CreateFile { fsid, .. }
            | Operation::CreateDirectory { fsid, .. }
            | Operation::RemoveFile { fsid, .. }
            | Operation::RemoveDirectory { fsid, .. }
            | Operation::RenamePath { fsid, .. }
            | Operation::CopyPath { fsid, .. }
            | Operation::Move { fsid, .. }
            | Operation::Peek { fsid, .. }
            | Operation::Poke { fsid, .. } => Some(fsid),
        }
    }

    /// The blob reference carried alongside the payload, if any
    pub fn data_reference(&self) -> Option<&DataReference> {
        match self {
            Operation::Poke { data_ref, .. } => Some(data_ref),
            _ => None,
        }
    }

    /// Path-like fields in declared order, tagged with their field name
    pub fn path_fields(&self) -> Vec<(PathField, &str)> {
        match self {
            Operation::Initialize | Operation::DestroyAll { .. } => Vec::new(),
            Operation::CreateFile { path, name, .. }
            | Operation::CreateDirectory { path, name, .. } => {
                vec![(PathField::Path, path.as_str()), (PathField::Name, name.as_str())]
            }
            Operation::RemoveFile { path, .. }
            | Operation::RemoveDirectory { path, .. }
            | Operation::Peek { path, .. }
            | Operation::Poke { path, .. } => vec![(PathField::Path, path.as_str())],
            Operation::RenamePath {
                old_path, new_path, ..
            } => vec![
                (PathField::OldPath, old_path.as_str()),
                (PathField::NewPath, new_path.as_str()),
            ],
            Operation::CopyPath {
                src_path,
                dest_path,
                ..
            } => vec![
                (PathField::SrcPath, src_path.as_str()),
                (PathField::DestPath, dest_path.as_str()),
            ],
            Operation::Move {
                src_path,
                dest_path,
                name,
                ..
            } => vec![
                (PathField::SrcPath, src_path.as_str()),
                (PathField::DestPath, dest_path.as_str()),
                (PathField::Name, name.as_str()),
            ],
        }
    }
}

/// Join a parent path and an entry name without doubling the separator
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}
