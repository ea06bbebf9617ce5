//! Error handlers
//!
//! Provides logging, retry classification and exit status mapping for client errors.

use crate::error::types::{QueryError, SubscriptionError, VfsClientError};
use log::error;

/// Handle a client error
pub fn handle_error(err: &VfsClientError) {
    error!("Client error: {}", err);
}

/// Whether the failed call may be repeated without side effects.
///
/// Only read-only calls that failed at the transport level qualify. Validation
/// and encoding failures will fail again, remote errors are answers, and a
/// submission may already have landed.
pub fn is_retry_safe(err: &VfsClientError) -> bool {
    match err {
        VfsClientError::Query(QueryError::Transport(_)) => true,
        VfsClientError::Subscription(SubscriptionError::Transport(_)) => true,
        VfsClientError::Encode(_)
        | VfsClientError::Query(QueryError::Remote(_))
        | VfsClientError::Submit(_)
        | VfsClientError::Subscription(_)
        | VfsClientError::Config(_) => false,
    }
}

/// Convert error to a process exit status
pub fn exit_code(err: &VfsClientError) -> i32 {
    match err {
        VfsClientError::Encode(_) => 2,
        VfsClientError::Config(_) => 3,
        VfsClientError::Query(QueryError::Transport(_)) => 4,
        VfsClientError::Query(QueryError::Remote(_)) => 5,
        VfsClientError::Submit(_) => 6,
        VfsClientError::Subscription(_) => 7,
    }
}
