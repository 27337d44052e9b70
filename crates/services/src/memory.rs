//! In-memory chunk store serving the Chunk group.

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;
use vault_transport::Origin;

use crate::chunk::{
    ArrangeStoreRequest, ArrangeStoreResponse, CacheChunkRequest, CacheChunkResponse,
    ChunkService, DeleteChunkRequest, DeleteChunkResponse, GetChunkRequest, GetChunkResponse,
    HasChunkRequest, HasChunkResponse, StoreChunkRequest, StoreChunkResponse,
    ValidateChunkRequest, ValidateChunkResponse,
};

/// Default byte budget of the chunk cache.
pub const DEFAULT_CACHE_CAPACITY: u64 = 8 * 1024 * 1024;

/// Proof of possession of `data` for `challenge`.
#[must_use]
pub fn validation_digest(challenge: &[u8], data: &[u8]) -> Bytes {
    let mut hasher = Sha256::new();
    hasher.update(challenge);
    hasher.update(data);
    Bytes::from(hasher.finalize().to_vec())
}

/// Bytes held by stored chunks and promised to arrangements.
#[derive(Debug, Default)]
struct Space {
    used: u64,
    reserved: u64,
}

/// Least recently used chunks, bounded in bytes.
#[derive(Debug)]
struct ChunkCache {
    entries: LruCache<String, Bytes>,
    size: u64,
    max_size: u64,
}

impl ChunkCache {
    fn new(max_size: u64) -> Self {
        Self {
            entries: LruCache::unbounded(),
            size: 0,
            max_size,
        }
    }

    /// Insert `data`, evicting old entries to fit. Rejects chunks larger
    /// than the whole budget.
    fn put(&mut self, name: String, data: Bytes) -> bool {
        let data_size = data.len() as u64;
        if data_size > self.max_size {
            return false;
        }

        if let Some(old) = self.entries.pop(&name) {
            self.size -= old.len() as u64;
        }
        let mut evicted = 0;
        while self.size + data_size > self.max_size {
            match self.entries.pop_lru() {
                Some((_, entry)) => {
                    self.size -= entry.len() as u64;
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            debug!(evicted, "evicted cached chunks to make room");
        }

        self.entries.push(name, data);
        self.size += data_size;
        true
    }

    fn get(&mut self, name: &str) -> Option<Bytes> {
        self.entries.get(name).cloned()
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    fn remove(&mut self, name: &str) {
        if let Some(old) = self.entries.pop(name) {
            self.size -= old.len() as u64;
        }
    }
}

/// Chunk store with a fixed capacity, held entirely in memory.
///
/// Cached chunks live in a separate least-recently-used cache with its own
/// byte budget. They are served by `get_chunk` and `has_chunk` alongside
/// stored ones but never count against the capacity.
#[derive(Debug)]
pub struct MemoryChunkService {
    vault_id: String,
    capacity: u64,
    space: Mutex<Space>,
    chunks: DashMap<String, Bytes>,
    arranged: DashMap<String, u64>,
    cache: Mutex<ChunkCache>,
}

impl MemoryChunkService {
    /// Empty store for vault `vault_id` holding at most `capacity` bytes,
    /// with a cache of [`DEFAULT_CACHE_CAPACITY`] bytes.
    pub fn new(vault_id: impl Into<String>, capacity: u64) -> Self {
        Self::with_cache_capacity(vault_id, capacity, DEFAULT_CACHE_CAPACITY)
    }

    /// Empty store whose cache holds at most `cache_capacity` bytes.
    pub fn with_cache_capacity(
        vault_id: impl Into<String>,
        capacity: u64,
        cache_capacity: u64,
    ) -> Self {
        Self {
            vault_id: vault_id.into(),
            capacity,
            space: Mutex::new(Space::default()),
            chunks: DashMap::new(),
            arranged: DashMap::new(),
            cache: Mutex::new(ChunkCache::new(cache_capacity)),
        }
    }

    /// Bytes held by stored chunks.
    pub fn space_used(&self) -> u64 {
        self.space.lock().used
    }

    /// Bytes reserved by accepted arrangements.
    pub fn space_reserved(&self) -> u64 {
        self.space.lock().reserved
    }

    /// Bytes held by cached chunks.
    pub fn cache_size(&self) -> u64 {
        self.cache.lock().size
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<Bytes> {
        let stored = self.chunks.get(name).map(|entry| entry.value().clone());
        stored.or_else(|| self.cache.lock().get(name))
    }

    fn fits(&self, space: &Space, size: u64) -> bool {
        space
            .used
            .checked_add(space.reserved)
            .and_then(|total| total.checked_add(size))
            .is_some_and(|total| total <= self.capacity)
    }
}

impl ChunkService for MemoryChunkService {
    fn arrange_store(
        &self,
        origin: &Origin,
        request: &ArrangeStoreRequest,
    ) -> Option<ArrangeStoreResponse> {
        let accepted = if self.chunks.contains_key(&request.chunk_name) {
            false
        } else {
            match self.arranged.entry(request.chunk_name.clone()) {
                Entry::Occupied(existing) => *existing.get() == request.data_size,
                Entry::Vacant(slot) => {
                    let mut space = self.space.lock();
                    let fits = self.fits(&space, request.data_size);
                    if fits {
                        space.reserved += request.data_size;
                        slot.insert(request.data_size);
                    }
                    fits
                }
            }
        };
        debug!(peer = %origin.peer, chunk = %request.chunk_name, accepted, "arrange store");

        Some(ArrangeStoreResponse {
            accepted,
            vault_id: self.vault_id.clone(),
        })
    }

    fn store_chunk(&self, origin: &Origin, request: &StoreChunkRequest) -> Option<StoreChunkResponse> {
        let size = request.data.len() as u64;
        let stored = match self.chunks.entry(request.chunk_name.clone()) {
            Entry::Occupied(existing) => *existing.get() == request.data,
            Entry::Vacant(slot) => {
                let arrangement = self
                    .arranged
                    .remove(&request.chunk_name)
                    .map_or(0, |(_, reserved)| reserved);
                let mut space = self.space.lock();
                space.reserved -= arrangement;
                let fits = self.fits(&space, size);
                if fits {
                    space.used += size;
                    slot.insert(request.data.clone());
                }
                fits
            }
        };
        debug!(peer = %origin.peer, chunk = %request.chunk_name, size, stored, "store chunk");

        Some(StoreChunkResponse { stored })
    }

    fn get_chunk(&self, _origin: &Origin, request: &GetChunkRequest) -> Option<GetChunkResponse> {
        let response = match self.lookup(&request.chunk_name) {
            Some(data) => GetChunkResponse { found: true, data },
            None => GetChunkResponse::default(),
        };
        Some(response)
    }

    fn has_chunk(&self, _origin: &Origin, request: &HasChunkRequest) -> Option<HasChunkResponse> {
        Some(HasChunkResponse {
            has_chunk: self.chunks.contains_key(&request.chunk_name)
                || self.cache.lock().contains(&request.chunk_name),
        })
    }

    fn validate_chunk(
        &self,
        _origin: &Origin,
        request: &ValidateChunkRequest,
    ) -> Option<ValidateChunkResponse> {
        let response = match self.chunks.get(&request.chunk_name) {
            Some(data) => ValidateChunkResponse {
                valid: true,
                digest: validation_digest(&request.challenge, data.value()),
            },
            None => ValidateChunkResponse::default(),
        };
        Some(response)
    }

    fn delete_chunk(&self, origin: &Origin, request: &DeleteChunkRequest) -> Option<DeleteChunkResponse> {
        let removed = self.chunks.remove(&request.chunk_name);
        if let Some((_, data)) = &removed {
            self.space.lock().used -= data.len() as u64;
        }
        self.cache.lock().remove(&request.chunk_name);
        debug!(peer = %origin.peer, chunk = %request.chunk_name, deleted = removed.is_some(), "delete chunk");

        Some(DeleteChunkResponse {
            deleted: removed.is_some(),
        })
    }

    fn cache_chunk(&self, origin: &Origin, request: &CacheChunkRequest) -> Option<CacheChunkResponse> {
        let cached = !self.chunks.contains_key(&request.chunk_name)
            && self
                .cache
                .lock()
                .put(request.chunk_name.clone(), request.data.clone());
        debug!(peer = %origin.peer, chunk = %request.chunk_name, cached, "cache chunk");

        Some(CacheChunkResponse { cached })
    }
}
