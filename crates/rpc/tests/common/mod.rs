//! Operations shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vault_crypto::{CryptoProvider, KeyPairProvider, NodeKeys};
use vault_rpc::{
    Message, Operation, OperationDefinition, PolicyTable, RpcConfig, RpcContext, SecurityPolicy,
    ServiceGroup, TimeoutConfig,
};

pub const BASE: u32 = 100;
pub const INITIAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChunkRequest {
    pub name: String,
    pub data: Vec<u8>,
}

impl Message for StoreChunkRequest {
    fn is_well_formed(&self) -> bool {
        !self.name.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChunkResponse {
    pub stored: bool,
}

impl Message for StoreChunkResponse {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkRequest {
    pub name: String,
}

impl Message for GetChunkRequest {
    fn is_well_formed(&self) -> bool {
        !self.name.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkResponse {
    pub data: Vec<u8>,
}

impl Message for GetChunkResponse {}

pub struct Chunk;

impl ServiceGroup for Chunk {
    const NAME: &'static str = "Chunk";
    const OPERATIONS: &'static [OperationDefinition] = &[
        OperationDefinition::new("Chunk", "StoreChunk", "Stores a chunk."),
        OperationDefinition::new("Chunk", "GetChunk", "Retrieves a chunk."),
    ];
}

pub struct StoreChunk;

impl Operation for StoreChunk {
    type Group = Chunk;
    type Request = StoreChunkRequest;
    type Response = StoreChunkResponse;
    const NAME: &'static str = "StoreChunk";
    const DESCRIPTION: &'static str = "Stores a chunk.";
}

pub struct GetChunk;

impl Operation for GetChunk {
    type Group = Chunk;
    type Request = GetChunkRequest;
    type Response = GetChunkResponse;
    const NAME: &'static str = "GetChunk";
    const DESCRIPTION: &'static str = "Retrieves a chunk.";
}

pub fn config(policy: SecurityPolicy) -> RpcConfig {
    RpcConfig {
        base_layer_max_type: BASE,
        security: PolicyTable::uniform(policy),
        timeouts: TimeoutConfig {
            default_initial_ms: 250,
        },
    }
}

pub fn permissive() -> Arc<RpcContext> {
    Arc::new(RpcContext::new(&config(SecurityPolicy::Permissive), Chunk::OPERATIONS, None).unwrap())
}

pub fn strict(crypto: Arc<dyn CryptoProvider>) -> Arc<RpcContext> {
    Arc::new(
        RpcContext::new(&config(SecurityPolicy::Strict), Chunk::OPERATIONS, Some(crypto)).unwrap(),
    )
}

/// Contexts for two peers that trust each other.
pub fn strict_pair() -> (Arc<RpcContext>, Arc<RpcContext>) {
    let a = NodeKeys::generate();
    let b = NodeKeys::generate();
    let (a_public, b_public) = (a.public(), b.public());
    (
        strict(Arc::new(KeyPairProvider::new(a, b_public))),
        strict(Arc::new(KeyPairProvider::new(b, a_public))),
    )
}

pub fn loopback() -> Arc<dyn CryptoProvider> {
    Arc::new(KeyPairProvider::loopback(NodeKeys::generate()))
}
