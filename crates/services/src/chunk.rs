//! Storage of content-addressed chunks on a vault.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Ask a vault to reserve space for a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangeStoreRequest {
    /// Name of the chunk to be stored.
    pub chunk_name: String,
    /// Size of the chunk in bytes.
    pub data_size: u64,
}

/// Outcome of a space reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangeStoreResponse {
    /// Whether the vault reserved the space.
    pub accepted: bool,
    /// Identity of the vault that answered.
    pub vault_id: String,
}

/// Upload a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Chunk content.
    pub data: Bytes,
}

/// Outcome of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChunkResponse {
    /// Whether the chunk is now held.
    pub stored: bool,
}

/// Download a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
}

/// Chunk content, if held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkResponse {
    /// Whether the chunk was found.
    pub found: bool,
    /// Chunk content; empty when not found.
    pub data: Bytes,
}

/// Ask whether a chunk is held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
}

/// Whether a chunk is held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasChunkResponse {
    /// Whether the chunk was found.
    pub has_chunk: bool,
}

/// Challenge a vault to prove it still holds a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Random bytes prepended to the content before hashing.
    pub challenge: Bytes,
}

/// Proof of possession.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateChunkResponse {
    /// Whether the chunk was found.
    pub valid: bool,
    /// SHA-256 of the challenge followed by the content.
    pub digest: Bytes,
}

/// Remove a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
}

/// Outcome of a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteChunkResponse {
    /// Whether a chunk was removed.
    pub deleted: bool,
}

/// Ask a vault to copy a chunk from another vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Vault currently holding the chunk.
    pub source_vault: String,
}

/// Outcome of a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateChunkResponse {
    /// Whether the chunk is now held.
    pub duplicated: bool,
}

/// Offer a chunk for caching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheChunkRequest {
    /// Name of the chunk.
    pub chunk_name: String,
    /// Chunk content.
    pub data: Bytes,
}

/// Outcome of a cache offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheChunkResponse {
    /// Whether the chunk was cached.
    pub cached: bool,
}

named_message!(
    ArrangeStoreRequest.chunk_name,
    StoreChunkRequest.chunk_name,
    GetChunkRequest.chunk_name,
    HasChunkRequest.chunk_name,
    ValidateChunkRequest.chunk_name,
    DeleteChunkRequest.chunk_name,
    DuplicateChunkRequest.chunk_name,
    CacheChunkRequest.chunk_name,
);

plain_message!(
    ArrangeStoreResponse,
    StoreChunkResponse,
    GetChunkResponse,
    HasChunkResponse,
    ValidateChunkResponse,
    DeleteChunkResponse,
    DuplicateChunkResponse,
    CacheChunkResponse,
);

service_group! {
    /// Chunk storage operations.
    group Chunk = "Chunk" {
        ArrangeStore => "Reserve space for a chunk before upload.";
        StoreChunk => "Store a chunk.";
        GetChunk => "Retrieve a chunk.";
        HasChunk => "Check whether a chunk is held.";
        ValidateChunk => "Prove possession of a chunk against a challenge.";
        DeleteChunk => "Delete a chunk.";
        DuplicateChunk => "Copy a chunk from another vault.";
        CacheChunk => "Cache a chunk passing through the vault.";
    }
}
