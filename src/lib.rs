//! Client for a ledger-backed virtual filesystem.
//!
//! Filesystem mutations are encoded into compact command payloads for
//! submission on-chain; reads and result lookups go over JSON-RPC; results
//! can also be pushed over a websocket subscription.

pub mod command;
pub mod config;
pub mod error;
pub mod path;
pub mod query;
pub mod submission;
pub mod subscription;
pub mod utils;

pub use command::{CommandPayload, FilesystemId, Instruction, Operation, encode};
pub use config::{ClientConfig, Commitment};
pub use error::VfsClientError;
pub use path::validate_path;
pub use query::QueryClient;
pub use submission::{Submitter, TransactionId, submit_operation};
pub use subscription::{ResultSubscriber, ResultSubscription, SubscriptionEvent};
