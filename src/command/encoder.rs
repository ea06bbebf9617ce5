//! Command encoder
//!
//! Maps an [`Operation`] to the exact byte sequence the server-side
//! interpreter decodes. Layout, little-endian throughout:
//!
//! `[discriminator: u8][fsid: u64][offsets: u64...][strings joined by 0x00]`
//!
//! Encoding is a pure function of its input, which lets the submission layer
//! retry a payload byte-for-byte.

use log::debug;

use crate::command::operation::{Discriminator, Operation, join_path};
use crate::error::EncodeError;
use crate::path::{PathField, validate_field};

const STRING_SEPARATOR: u8 = 0x00;

/// Immutable instruction payload produced for one operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandPayload(Vec<u8>);

impl CommandPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Discriminator from the leading byte
    pub fn discriminator(&self) -> Option<Discriminator> {
        self.0.first().copied().and_then(Discriminator::from_byte)
    }
}

impl AsRef<[u8]> for CommandPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Run every path field of the operation through the validator.
///
/// Create operations also validate the joined `path/name` the server will
/// reconstruct.
pub fn validate_operation(op: &Operation) -> Result<(), EncodeError> {
    for (field, value) in op.path_fields() {
        validate_field(field, value)?;
    }

    if let Operation::CreateFile { path, name, .. } | Operation::CreateDirectory { path, name, .. } =
        op
    {
        validate_field(PathField::JoinedPath, &join_path(path, name))?;
    }

    Ok(())
}

/// Encode an operation into its command payload.
///
/// Fails with [`EncodeError::InvalidPath`] or [`EncodeError::InvalidFilesystemId`]
/// before any byte is produced.
pub fn encode(op: &Operation) -> Result<CommandPayload, EncodeError> {
    validate_operation(op)?;

    let mut writer = PayloadWriter::new(op.discriminator());

    match op {
        Operation::Initialize => {}
        Operation::DestroyAll { fsid } => {
            writer.u64_le(fsid.value()?);
        }
        Operation::CreateFile {
            fsid, path, name, ..
        }
        | Operation::CreateDirectory {
            fsid, path, name, ..
        } => {
            writer.u64_le(fsid.value()?);
            writer.strings(&[path, name]);
        }
        Operation::RemoveFile { fsid, path } | Operation::RemoveDirectory { fsid, path } => {
            writer.u64_le(fsid.value()?);
            writer.strings(&[path]);
        }
        Operation::RenamePath {
            fsid,
            old_path,
            new_path,
        } => {
            writer.u64_le(fsid.value()?);
            writer.strings(&[old_path, new_path]);
        }
        Operation::CopyPath {
            fsid,
            src_path,
            dest_path,
        } => {
            writer.u64_le(fsid.value()?);
            writer.strings(&[src_path, dest_path]);
        }
        Operation::Move {
            fsid,
            src_path,
            dest_path,
            name,
        } => {
            writer.u64_le(fsid.value()?);
            writer.strings(&[src_path, dest_path, name]);
        }
        Operation::Peek {
            fsid,
            path,
            start_offset,
            end_offset,
        } => {
            writer.u64_le(fsid.value()?);
            writer.u64_le(*start_offset);
            writer.u64_le(*end_offset);
            writer.strings(&[path]);
        }
        Operation::Poke {
            fsid, path, offset, ..
        } => {
            // The data reference travels as a participant, not in the payload
            writer.u64_le(fsid.value()?);
            writer.u64_le(*offset);
            writer.strings(&[path]);
        }
    }

    let payload = writer.finish();
    debug!("Encoded {} into {} bytes", op.name(), payload.len());
    Ok(payload)
}

struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    fn new(discriminator: Discriminator) -> Self {
        Self {
            buf: vec![discriminator.as_byte()],
        }
    }

    fn u64_le(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// UTF-8 strings with one separator between consecutive values, none after the last
    fn strings(&mut self, values: &[&String]) {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.buf.push(STRING_SEPARATOR);
            }
            self.buf.extend_from_slice(value.as_bytes());
        }
    }

    fn finish(self) -> CommandPayload {
        CommandPayload(self.buf)
    }
}
