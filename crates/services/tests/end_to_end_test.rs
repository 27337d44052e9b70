//! Service groups served over the in-memory transport.

use std::sync::Arc;

use bytes::Bytes;
use vault_crypto::{KeyPairProvider, NodeKeys};
use vault_rpc::{CallStatus, MessageHandler, RpcConfig, RpcContext, SecurityPolicy};
use vault_services::account::AccountStatusRequest;
use vault_services::buffer::AddBufferMessageRequest;
use vault_services::chunk::{
    DeleteChunkRequest, GetChunkRequest, HasChunkRequest, StoreChunkRequest, ValidateChunkRequest,
};
use vault_services::{
    AccountClient, BufferClient, ChunkClient, MemoryChunkService, Unimplemented, bind_account,
    bind_all, bind_buffer, bind_chunk, bind_chunk_info, bind_vault_sync, definitions,
    validation_digest,
};
use vault_transport::{Endpoint, TransportError};
use vault_transport_memory::MemoryNetwork;

const CLIENT: &str = "client";
const VAULT: &str = "vault";

fn strict_contexts() -> (Arc<RpcContext>, Arc<RpcContext>) {
    let client = NodeKeys::generate();
    let vault = NodeKeys::generate();
    let (client_public, vault_public) = (client.public(), vault.public());
    let config = RpcConfig::default();
    let definitions = definitions();

    let client_context = RpcContext::new(
        &config,
        &definitions,
        Some(Arc::new(KeyPairProvider::new(client, vault_public))),
    )
    .unwrap();
    let vault_context = RpcContext::new(
        &config,
        &definitions,
        Some(Arc::new(KeyPairProvider::new(vault, client_public))),
    )
    .unwrap();
    (Arc::new(client_context), Arc::new(vault_context))
}

fn permissive_context() -> Arc<RpcContext> {
    let mut config = RpcConfig::default();
    config.security.default = SecurityPolicy::Permissive;
    Arc::new(RpcContext::new(&config, &definitions(), None).unwrap())
}

#[tokio::test]
async fn chunk_lifecycle_over_strict_channel() {
    let _ = tracing_subscriber::fmt::try_init();

    let (client_context, vault_context) = strict_contexts();
    let network = MemoryNetwork::new();

    let service = Arc::new(MemoryChunkService::new(VAULT, 1 << 20));
    let handler = Arc::new(MessageHandler::new(vault_context));
    bind_chunk(&handler, Arc::clone(&service)).unwrap();
    let unimplemented = Arc::new(Unimplemented);
    bind_chunk_info(&handler, Arc::clone(&unimplemented)).unwrap();
    bind_account(&handler, Arc::clone(&unimplemented)).unwrap();
    bind_vault_sync(&handler, Arc::clone(&unimplemented)).unwrap();
    bind_buffer(&handler, unimplemented).unwrap();
    network.bind(VAULT, handler).unwrap();

    let client = ChunkClient::new(client_context, network.factory(CLIENT));
    let vault = Endpoint::new(VAULT);
    let data = Bytes::from_static(b"a chunk of content");

    let (status, stored) = client
        .store_chunk(
            vault.clone(),
            StoreChunkRequest {
                chunk_name: "alpha".into(),
                data: data.clone(),
            },
        )
        .await;
    assert_eq!(status, CallStatus::Success);
    assert!(stored.stored);
    assert_eq!(service.len(), 1);

    let (status, has) = client
        .has_chunk(vault.clone(), HasChunkRequest { chunk_name: "alpha".into() })
        .await;
    assert_eq!(status, CallStatus::Success);
    assert!(has.has_chunk);

    let (_, got) = client
        .get_chunk(vault.clone(), GetChunkRequest { chunk_name: "alpha".into() })
        .await;
    assert!(got.found);
    assert_eq!(got.data, data);

    let challenge = Bytes::from_static(b"challenge");
    let (_, validated) = client
        .validate_chunk(
            vault.clone(),
            ValidateChunkRequest {
                chunk_name: "alpha".into(),
                challenge: challenge.clone(),
            },
        )
        .await;
    assert!(validated.valid);
    assert_eq!(validated.digest, validation_digest(&challenge, &data));

    let (_, deleted) = client
        .delete_chunk(vault.clone(), DeleteChunkRequest { chunk_name: "alpha".into() })
        .await;
    assert!(deleted.deleted);

    let (status, got) = client
        .get_chunk(vault, GetChunkRequest { chunk_name: "alpha".into() })
        .await;
    assert_eq!(status, CallStatus::Success);
    assert!(!got.found);
}

#[tokio::test]
async fn unimplemented_operations_close_without_reply() {
    let _ = tracing_subscriber::fmt::try_init();

    let network = MemoryNetwork::new();
    let handler = Arc::new(MessageHandler::new(permissive_context()));
    bind_all(&handler, Arc::new(Unimplemented)).unwrap();
    network.bind(VAULT, handler).unwrap();

    let client = AccountClient::new(permissive_context(), network.factory(CLIENT));
    let (status, response) = client
        .account_status(
            Endpoint::new(VAULT),
            AccountStatusRequest {
                account_name: "alice".into(),
                space_requested: 0,
            },
        )
        .await;

    assert_eq!(status, CallStatus::DeliveryFailure(TransportError::ConnectionClosed));
    assert_eq!(response, Default::default());
}

#[tokio::test]
async fn nameless_requests_are_dropped() {
    let _ = tracing_subscriber::fmt::try_init();

    let network = MemoryNetwork::new();
    let service = Arc::new(MemoryChunkService::new(VAULT, 1024));
    let handler = Arc::new(MessageHandler::new(permissive_context()));
    bind_chunk(&handler, Arc::clone(&service)).unwrap();
    network.bind(VAULT, handler).unwrap();

    let client = ChunkClient::new(permissive_context(), network.factory(CLIENT));
    let (status, _) = client
        .store_chunk(
            Endpoint::new(VAULT),
            StoreChunkRequest {
                chunk_name: String::new(),
                data: Bytes::from_static(b"orphan"),
            },
        )
        .await;

    assert!(!status.is_success());
    assert!(service.is_empty());
}

#[tokio::test]
async fn unbound_group_is_not_answered() {
    let _ = tracing_subscriber::fmt::try_init();

    let network = MemoryNetwork::new();
    let handler = Arc::new(MessageHandler::new(permissive_context()));
    bind_chunk(&handler, Arc::new(MemoryChunkService::new(VAULT, 1024))).unwrap();
    network.bind(VAULT, handler).unwrap();

    let client = BufferClient::new(permissive_context(), network.factory(CLIENT));
    let (status, response) = client
        .add_buffer_message(
            Endpoint::new(VAULT),
            AddBufferMessageRequest {
                buffer_name: "inbox".into(),
                message: Bytes::from_static(b"hi"),
            },
        )
        .await;

    assert_eq!(status, CallStatus::DeliveryFailure(TransportError::ConnectionClosed));
    assert!(!response.added);
}

#[test]
fn contexts_agree_on_allocation() {
    let (a, b) = strict_contexts();
    let a_types: Vec<_> = a.registry().iter().map(|(ids, _)| ids).collect();
    let b_types: Vec<_> = b.registry().iter().map(|(ids, _)| ids).collect();
    assert_eq!(a_types, b_types);
    assert_eq!(a_types.len(), 25);
}
