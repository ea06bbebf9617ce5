//! JSON-RPC request/response exchange
//!
//! Envelope types shared by queries and subscriptions, and the HTTP transport
//! that carries a single exchange.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, warn};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{QueryError, RemoteError, TransportError};

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names, which must match the server exactly
pub mod methods {
    pub const IS_EXIST: &str = "isExist";
    pub const GET_METADATA: &str = "getMetadata";
    pub const GET_INFO: &str = "getInfo";
    pub const LIST_DIRS: &str = "listDirs";
    pub const GET_RESULT: &str = "getResult";
    pub const RESULT_SUBSCRIBE: &str = "resultSubscribe";
    pub const RESULT_UNSUBSCRIBE: &str = "resultUnsubscribe";
}

/// Outbound envelope: `{jsonrpc, id, method, params}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Serialized envelope for text transports
    pub fn to_text(&self) -> String {
        serde_json::json!({
            "jsonrpc": self.jsonrpc,
            "id": self.id,
            "method": self.method,
            "params": self.params,
        })
        .to_string()
    }
}

/// Error object inside a response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<RpcErrorObject> for RemoteError {
    fn from(error: RpcErrorObject) -> Self {
        RemoteError {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

/// Inbound response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Whether this response answers the request with the given id
    pub fn answers(&self, id: u64) -> bool {
        self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    /// The result payload, `Null` when absent, or the remote error
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// One-exchange-per-call JSON-RPC client over HTTP POST
#[derive(Debug)]
pub struct RpcClient {
    http_client: HttpClient,
    endpoint: Url,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for the given endpoint
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|_| TransportError::InvalidEndpoint(endpoint.to_string()))?;

        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue one request and wait for its response.
    ///
    /// Non-2xx statuses and undecodable bodies are transport errors; an
    /// `error` member in the envelope is a remote error.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, QueryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!("RPC request {} (id {}) to {}", method, id, self.endpoint);

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(TransportError::from)?;

        if !status.is_success() {
            warn!("RPC {} (id {}) failed with status {}", method, id, status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let envelope: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        if !envelope.answers(id) {
            debug!("RPC {} response id {:?} differs from request id {}", method, envelope.id, id);
        }

        Ok(envelope.into_result()?)
    }
}
