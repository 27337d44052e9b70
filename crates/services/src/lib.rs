//! Vault service groups.
//!
//! Five groups share the RPC core: [`Chunk`], [`ChunkInfo`], [`Account`],
//! [`VaultSync`] and [`Buffer`]. Each comes with its operation marker types,
//! request and response messages, a skeleton trait for callees, a `bind_*`
//! function and a typed client.
//!
//! All nodes must agree on [`definitions`], which fixes the message-type
//! allocation.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[macro_use]
mod macros;

pub mod account;
pub mod buffer;
pub mod chunk;
pub mod chunk_info;
pub mod memory;
pub mod unimplemented;
pub mod vault_sync;

use std::sync::Arc;

use vault_rpc::{MessageHandler, OperationDefinition, Result, ServiceGroup};

pub use account::{Account, AccountClient, AccountService, bind_account};
pub use buffer::{Buffer, BufferClient, BufferService, bind_buffer};
pub use chunk::{Chunk, ChunkClient, ChunkService, bind_chunk};
pub use chunk_info::{ChunkInfo, ChunkInfoClient, ChunkInfoService, bind_chunk_info};
pub use memory::{DEFAULT_CACHE_CAPACITY, MemoryChunkService, validation_digest};
pub use unimplemented::Unimplemented;
pub use vault_sync::{VaultSync, VaultSyncClient, VaultSyncService, bind_vault_sync};

/// Every operation of every group, in allocation order.
#[must_use]
pub fn definitions() -> Vec<OperationDefinition> {
    [
        Chunk::OPERATIONS,
        ChunkInfo::OPERATIONS,
        Account::OPERATIONS,
        VaultSync::OPERATIONS,
        Buffer::OPERATIONS,
    ]
    .concat()
}

/// Bind one service implementing every group.
///
/// # Errors
///
/// Fails if the handler's registry lacks any group.
pub fn bind_all<S>(handler: &MessageHandler, service: Arc<S>) -> Result<()>
where
    S: ChunkService + ChunkInfoService + AccountService + VaultSyncService + BufferService,
{
    bind_chunk(handler, Arc::clone(&service))?;
    bind_chunk_info(handler, Arc::clone(&service))?;
    bind_account(handler, Arc::clone(&service))?;
    bind_vault_sync(handler, Arc::clone(&service))?;
    bind_buffer(handler, service)
}
