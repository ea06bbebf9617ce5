//! Error types
//!
//! Defines domain-specific error types for each layer of the client:
//! validation, encoding, transport, remote failures, submission and subscriptions.

use std::fmt;

use crate::path::PathField;

/// Path validation failures, one variant per rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    ConsecutiveSeparators,
    ParentTraversal,
    ControlCharacter(u32),
    DisallowedCharacter(char),
    ReservedCharacter(char),
    ComponentTooLong { component: String, len: usize },
    PathTooLong(usize),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "Path cannot be empty or whitespace-only"),
            PathError::ConsecutiveSeparators => {
                write!(f, "Consecutive slashes (//) are not allowed")
            }
            PathError::ParentTraversal => {
                write!(f, "Path traversal sequences (..) are not allowed")
            }
            PathError::ControlCharacter(code) => {
                write!(f, "Control character U+{:04X} is not allowed", code)
            }
            PathError::DisallowedCharacter(c) => write!(
                f,
                "Character {:?} is not allowed; use letters, digits, '/', '_', '-' or '.'",
                c
            ),
            PathError::ReservedCharacter(c) => {
                write!(f, "Reserved filesystem character {:?} is not allowed", c)
            }
            PathError::ComponentTooLong { component, len } => write!(
                f,
                "Path component {:?} is {} bytes (max 255)",
                component, len
            ),
            PathError::PathTooLong(len) => write!(f, "Path is {} bytes (max 4096)", len),
        }
    }
}

impl std::error::Error for PathError {}

/// Errors raised while turning an operation into a command payload.
/// These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    InvalidPath { field: PathField, rule: PathError },
    InvalidFilesystemId(String),
    MalformedOperation(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::InvalidPath { field, rule } => {
                write!(f, "Invalid {}: {}", field, rule)
            }
            EncodeError::InvalidFilesystemId(raw) => write!(
                f,
                "Invalid filesystem id {:?}: expected a decimal integer in 0..=18446744073709551615",
                raw
            ),
            EncodeError::MalformedOperation(msg) => write!(f, "Malformed operation: {}", msg),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Channel-level failures: the exchange could not be completed
#[derive(Debug)]
pub enum TransportError {
    InvalidEndpoint(String),
    Http(reqwest::Error),
    Status { status: u16, body: String },
    MalformedResponse(String),
    WebSocket(tokio_tungstenite::tungstenite::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidEndpoint(url) => write!(f, "Invalid endpoint: {}", url),
            TransportError::Http(e) => write!(f, "HTTP request failed: {}", e),
            TransportError::Status { status, body } => {
                write!(f, "HTTP error! Status: {}, message: {}", status, body)
            }
            TransportError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            TransportError::WebSocket(e) => write!(f, "WebSocket error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::Http(error)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(error)
    }
}

/// Structured failure reported by the far end after a completed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Remote error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Query client errors
#[derive(Debug)]
pub enum QueryError {
    Transport(TransportError),
    Remote(RemoteError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Transport(e) => write!(f, "Transport error: {}", e),
            QueryError::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<TransportError> for QueryError {
    fn from(error: TransportError) -> Self {
        QueryError::Transport(error)
    }
}

impl From<RemoteError> for QueryError {
    fn from(error: RemoteError) -> Self {
        QueryError::Remote(error)
    }
}

/// Failures reported by the submission collaborator
#[derive(Debug)]
pub enum SubmitError {
    Transport(TransportError),
    Rejected(String),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Transport(e) => write!(f, "Submission transport error: {}", e),
            SubmitError::Rejected(msg) => write!(f, "Submission rejected: {}", msg),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<TransportError> for SubmitError {
    fn from(error: TransportError) -> Self {
        SubmitError::Transport(error)
    }
}

/// Result subscription errors
#[derive(Debug)]
pub enum SubscriptionError {
    Transport(TransportError),
    Remote(RemoteError),
    Closed,
    NoHandle,
    AlreadyWatching(String),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::Transport(e) => write!(f, "Subscription transport error: {}", e),
            SubscriptionError::Remote(e) => write!(f, "Subscription {}", e),
            SubscriptionError::Closed => write!(f, "Subscription closed"),
            SubscriptionError::NoHandle => {
                write!(f, "No subscription handle has been received yet")
            }
            SubscriptionError::AlreadyWatching(id) => {
                write!(f, "A result subscription for {} is already open", id)
            }
        }
    }
}

impl std::error::Error for SubscriptionError {}

impl From<TransportError> for SubscriptionError {
    fn from(error: TransportError) -> Self {
        SubscriptionError::Transport(error)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SubscriptionError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        SubscriptionError::Transport(TransportError::WebSocket(error))
    }
}

/// General client error that encompasses all error types
#[derive(Debug)]
pub enum VfsClientError {
    Encode(EncodeError),
    Query(QueryError),
    Submit(SubmitError),
    Subscription(SubscriptionError),
    Config(config::ConfigError),
}

impl fmt::Display for VfsClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsClientError::Encode(e) => write!(f, "Encoding error: {}", e),
            VfsClientError::Query(e) => write!(f, "Query error: {}", e),
            VfsClientError::Submit(e) => write!(f, "{}", e),
            VfsClientError::Subscription(e) => write!(f, "{}", e),
            VfsClientError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for VfsClientError {}

impl From<EncodeError> for VfsClientError {
    fn from(error: EncodeError) -> Self {
        VfsClientError::Encode(error)
    }
}

impl From<QueryError> for VfsClientError {
    fn from(error: QueryError) -> Self {
        VfsClientError::Query(error)
    }
}

impl From<SubmitError> for VfsClientError {
    fn from(error: SubmitError) -> Self {
        VfsClientError::Submit(error)
    }
}

impl From<SubscriptionError> for VfsClientError {
    fn from(error: SubscriptionError) -> Self {
        VfsClientError::Subscription(error)
    }
}

impl From<config::ConfigError> for VfsClientError {
    fn from(error: config::ConfigError) -> Self {
        VfsClientError::Config(error)
    }
}
