//! Command encoding
//!
//! Operation model, discriminators, the byte-exact command encoder and
//! instruction assembly for submission.

pub mod encoder;
pub mod instruction;
pub mod operation;

pub use encoder::{CommandPayload, encode, validate_operation};
pub use instruction::{Instruction, Participant};
pub use operation::{DataReference, Discriminator, FilesystemId, Operation, join_path};
