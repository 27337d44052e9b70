//! Catch-up of state between vaults that take over each other's ranges.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Ask for everything a vault manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSyncDataRequest {
    /// Vault asking.
    pub vault_id: String,
}

/// Names of everything a vault manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSyncDataResponse {
    /// Chunk info records.
    pub chunk_info_names: Vec<String>,
    /// Accounts.
    pub account_names: Vec<String>,
    /// Buffers.
    pub buffer_names: Vec<String>,
}

/// Fetch one account record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountRequest {
    /// Account wanted.
    pub account_name: String,
}

/// Serialized account record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountResponse {
    /// Whether the record was found.
    pub found: bool,
    /// Record content.
    pub account: Bytes,
}

/// Fetch one chunk info record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkInfoRequest {
    /// Chunk wanted.
    pub chunk_name: String,
}

/// Serialized chunk info record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkInfoResponse {
    /// Whether the record was found.
    pub found: bool,
    /// Record content.
    pub chunk_info: Bytes,
}

/// Fetch one buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBufferRequest {
    /// Buffer wanted.
    pub buffer_name: String,
}

/// Serialized buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBufferResponse {
    /// Whether the buffer was found.
    pub found: bool,
    /// Buffer content.
    pub buffer: Bytes,
}

named_message!(
    GetSyncDataRequest.vault_id,
    GetAccountRequest.account_name,
    GetChunkInfoRequest.chunk_name,
    GetBufferRequest.buffer_name,
);

plain_message!(
    GetSyncDataResponse,
    GetAccountResponse,
    GetChunkInfoResponse,
    GetBufferResponse,
);

service_group! {
    /// Vault synchronisation operations.
    group VaultSync = "VaultSync" {
        GetSyncData => "List the records a vault manages.";
        GetAccount => "Fetch an account record.";
        GetChunkInfo => "Fetch a chunk info record.";
        GetBuffer => "Fetch a buffer.";
    }
}
