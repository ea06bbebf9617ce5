//! Submission seam
//!
//! The ledger transaction mechanism is an external collaborator: it takes a
//! signed instruction and returns the identifier of the submitted operation.
//! This module only defines that boundary.

use std::fmt;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use crate::command::{Instruction, Operation};
use crate::error::{SubmitError, VfsClientError};

/// Identifier returned for a submitted operation, used for result lookup
/// and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Signs and submits instructions to the ledger.
///
/// Retrying a failed submission is only safe when the implementation
/// guarantees idempotent resubmission.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, instruction: Instruction) -> Result<TransactionId, SubmitError>;
}

/// Validate, encode and submit one operation.
///
/// Validation and encoding failures are returned before the submitter is called.
pub async fn submit_operation<S>(
    submitter: &S,
    program_id: &str,
    signer: &str,
    op: &Operation,
) -> Result<TransactionId, VfsClientError>
where
    S: Submitter + ?Sized,
{
    let instruction = Instruction::build(program_id, signer, op)?;
    let tx_id = submitter.submit(instruction).await?;
    info!("Submitted {} as transaction {}", op.name(), tx_id);
    Ok(tx_id)
}
