//! Query client
//!
//! JSON-RPC request shaping, the HTTP exchange, and typed results for the
//! read-only query kinds.

pub mod operations;
pub mod results;
pub mod rpc;

pub use operations::QueryClient;
pub use results::{
    DirEntry, EntryType, Existence, FileMetadata, InfoResult, Listing, MetadataResult,
    OperationOutcome, OperationResult, PathInfo,
};
pub use rpc::{RpcClient, RpcRequest, RpcResponse, methods};
