//! Query operations
//!
//! Read-only lookups against the request/response endpoint. Every call is a
//! single idempotent exchange and may be retried freely.

use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{QueryError, TransportError};
use crate::query::results::{Existence, InfoResult, Listing, MetadataResult, OperationResult};
use crate::query::rpc::{RpcClient, methods};
use crate::submission::TransactionId;

/// Client for existence, metadata, info, listing and result lookups
#[derive(Debug)]
pub struct QueryClient {
    rpc: RpcClient,
    settle_delay: Duration,
}

impl QueryClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let rpc = RpcClient::new(&config.rpc_url, config.request_timeout())?;
        Ok(Self {
            rpc,
            settle_delay: config.result_settle_delay(),
        })
    }

    /// Create a client for an endpoint, with default timeout and settle delay
    pub fn with_endpoint(endpoint: &str) -> Result<Self, TransportError> {
        Self::new(&ClientConfig {
            rpc_url: endpoint.to_string(),
            ..ClientConfig::default()
        })
    }

    /// Override the delay applied before result lookups
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint().as_str()
    }

    /// Check whether a file or directory exists at `path`
    pub async fn exists(&self, path: &str) -> Result<Existence, QueryError> {
        let value = self.rpc.call(methods::IS_EXIST, vec![Value::from(path)]).await?;
        Ok(Existence::from_value(value))
    }

    /// Fetch type, size and timestamps for `path`
    pub async fn metadata(&self, path: &str) -> Result<MetadataResult, QueryError> {
        let value = self
            .rpc
            .call(methods::GET_METADATA, vec![Value::from(path)])
            .await?;
        Ok(MetadataResult::from_value(value))
    }

    /// Fetch parent path, depth and type for `path`
    pub async fn info(&self, path: &str) -> Result<InfoResult, QueryError> {
        let value = self.rpc.call(methods::GET_INFO, vec![Value::from(path)]).await?;
        Ok(InfoResult::from_value(value))
    }

    /// List the entries of the directory at `path`
    pub async fn list_directory(&self, path: &str) -> Result<Listing, QueryError> {
        let value = self.rpc.call(methods::LIST_DIRS, vec![Value::from(path)]).await?;
        Ok(Listing::from_value(value))
    }

    /// Look up the outcome of a submitted operation after the settle delay.
    ///
    /// `Pending` is a normal answer; prefer a result subscription for timely
    /// delivery.
    pub async fn operation_result(
        &self,
        tx_id: &TransactionId,
    ) -> Result<OperationResult, QueryError> {
        if !self.settle_delay.is_zero() {
            debug!(
                "Waiting {:?} before looking up result of {}",
                self.settle_delay, tx_id
            );
            tokio::time::sleep(self.settle_delay).await;
        }
        self.lookup_result_now(tx_id).await
    }

    /// Look up the outcome of a submitted operation without waiting
    pub async fn lookup_result_now(
        &self,
        tx_id: &TransactionId,
    ) -> Result<OperationResult, QueryError> {
        let value = self
            .rpc
            .call(methods::GET_RESULT, vec![Value::from(tx_id.as_str())])
            .await?;
        Ok(OperationResult::from_value(value))
    }
}
