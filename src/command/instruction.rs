//! Instruction assembly
//!
//! Bundles a command payload with the participants and addressing target the
//! submission collaborator needs.

use serde::Serialize;

use crate::command::encoder::{CommandPayload, encode};
use crate::command::operation::Operation;
use crate::error::EncodeError;

/// An account taking part in a submitted instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub reference: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl Participant {
    pub fn signer(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            is_signer: true,
            is_writable: true,
        }
    }

    pub fn read_only(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            is_signer: false,
            is_writable: false,
        }
    }
}

/// Everything handed to the submission collaborator for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: String,
    pub participants: Vec<Participant>,
    pub data: CommandPayload,
}

impl Instruction {
    /// Validate and encode `op`, then attach participants.
    ///
    /// The signer always comes first. A poke's data reference follows as a
    /// read-only participant.
    pub fn build(program_id: &str, signer: &str, op: &Operation) -> Result<Self, EncodeError> {
        let data = encode(op)?;

        let mut participants = vec![Participant::signer(signer)];
        if let Some(data_ref) = op.data_reference() {
            participants.push(Participant::read_only(data_ref.as_str()));
        }

        Ok(Self {
            program_id: program_id.to_string(),
            participants,
            data,
        })
    }

    pub fn signer(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_signer)
    }
}
