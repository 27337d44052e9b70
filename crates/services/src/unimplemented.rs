//! Skeleton answering nothing.

use crate::account::AccountService;
use crate::buffer::BufferService;
use crate::chunk::ChunkService;
use crate::chunk_info::ChunkInfoService;
use crate::vault_sync::VaultSyncService;

/// Implements every group with the default methods.
///
/// Requests are accepted and the exchange closes without a response.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unimplemented;

impl ChunkService for Unimplemented {}
impl ChunkInfoService for Unimplemented {}
impl AccountService for Unimplemented {}
impl VaultSyncService for Unimplemented {}
impl BufferService for Unimplemented {}
