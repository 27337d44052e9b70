//! Watch and reference lists kept by the vaults managing a chunk.

use serde::{Deserialize, Serialize};

/// Register an account as watcher of a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToWatchListRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Size of the chunk in bytes.
    pub chunk_size: u64,
    /// Account taking the space.
    pub account_name: String,
}

/// Outcome of a watch registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToWatchListResponse {
    /// Whether the registration was accepted.
    pub accepted: bool,
    /// Copies the caller still has to upload.
    pub upload_count: u32,
}

/// Remove an account from the watchers of a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromWatchListRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Account giving up the chunk.
    pub account_name: String,
}

/// Outcome of a watch removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromWatchListResponse {
    /// Whether the account was watching.
    pub removed: bool,
}

/// Record a vault as holder of a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToReferenceListRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Vault holding a copy.
    pub vault_id: String,
}

/// Outcome of a reference registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToReferenceListResponse {
    /// Whether the reference was added.
    pub added: bool,
}

/// List the vaults holding a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkReferencesRequest {
    /// Name of the chunk.
    pub chunk_name: String,
}

/// Vaults holding a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkReferencesResponse {
    /// Vault identities.
    pub references: Vec<String>,
}

named_message!(
    AddToWatchListRequest.chunk_name,
    RemoveFromWatchListRequest.chunk_name,
    AddToReferenceListRequest.chunk_name,
    GetChunkReferencesRequest.chunk_name,
);

plain_message!(
    AddToWatchListResponse,
    RemoveFromWatchListResponse,
    AddToReferenceListResponse,
    GetChunkReferencesResponse,
);

service_group! {
    /// Chunk bookkeeping operations.
    group ChunkInfo = "ChunkInfo" {
        AddToWatchList => "Add an account to the watch list of a chunk.";
        RemoveFromWatchList => "Remove an account from the watch list of a chunk.";
        AddToReferenceList => "Add a vault to the reference list of a chunk.";
        GetChunkReferences => "List the vaults referencing a chunk.";
    }
}
