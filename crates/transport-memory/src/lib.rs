//! Transport over an in-process network of bound endpoints.
//!
//! Endpoints are bound to receive handlers on a shared [`MemoryNetwork`].
//! Sending to an endpoint runs its handler inline and hands any reply back
//! to the sending transport's own handler, so a full request/reply exchange
//! happens without sockets.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, instrument, warn};
use vault_transport::{
    Endpoint, Origin, ReceiveHandler, Timeout, Transport, TransportError, TransportFactory,
    TransportResult,
};

/// Shared routing table connecting memory transports.
#[derive(Default)]
pub struct MemoryNetwork {
    listeners: DashMap<Endpoint, Arc<dyn ReceiveHandler>>,
    latency: DashMap<Endpoint, Duration>,
}

impl MemoryNetwork {
    /// Create an empty network.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start listening at `endpoint`.
    pub fn bind(
        &self,
        endpoint: impl Into<Endpoint>,
        handler: Arc<dyn ReceiveHandler>,
    ) -> TransportResult<()> {
        let endpoint = endpoint.into();
        if self.listeners.contains_key(&endpoint) {
            return Err(TransportError::InvalidEndpoint(format!(
                "{endpoint} is already bound"
            )));
        }

        debug!(%endpoint, "memory endpoint bound");
        self.listeners.insert(endpoint, handler);
        Ok(())
    }

    /// Stop listening at `endpoint`. Returns whether it was bound.
    pub fn unbind(&self, endpoint: &Endpoint) -> bool {
        self.listeners.remove(endpoint).is_some()
    }

    /// Delay every exchange addressed to `endpoint` by `delay`.
    pub fn set_latency(&self, endpoint: impl Into<Endpoint>, delay: Duration) {
        self.latency.insert(endpoint.into(), delay);
    }

    /// Create a transport whose exchanges originate from `local`.
    #[must_use]
    pub fn transport(self: &Arc<Self>, local: impl Into<Endpoint>) -> MemoryTransport {
        MemoryTransport {
            network: Arc::clone(self),
            local: local.into(),
            handler: RwLock::new(None),
        }
    }

    /// Create a factory producing transports that originate from `local`.
    #[must_use]
    pub fn factory(self: &Arc<Self>, local: impl Into<Endpoint>) -> MemoryTransportFactory {
        MemoryTransportFactory {
            network: Arc::clone(self),
            local: local.into(),
        }
    }

    fn listener(&self, endpoint: &Endpoint) -> Option<Arc<dyn ReceiveHandler>> {
        self.listeners
            .get(endpoint)
            .map(|entry| Arc::clone(entry.value()))
    }
}

/// Sending side of one exchange on a [`MemoryNetwork`].
pub struct MemoryTransport {
    network: Arc<MemoryNetwork>,
    local: Endpoint,
    handler: RwLock<Option<Arc<dyn ReceiveHandler>>>,
}

impl MemoryTransport {
    /// The endpoint exchanges originate from.
    #[must_use]
    pub const fn local(&self) -> &Endpoint {
        &self.local
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn set_receive_handler(&self, handler: Arc<dyn ReceiveHandler>) {
        *self.handler.write() = Some(handler);
    }

    #[instrument(skip(self, data), fields(local = %self.local, bytes = data.len()))]
    async fn send(
        &self,
        destination: &Endpoint,
        data: Bytes,
        timeout: Timeout,
    ) -> TransportResult<()> {
        let listener = self
            .network
            .listener(destination)
            .ok_or_else(|| TransportError::Unreachable(destination.to_string()))?;

        let delay = self.network.latency.get(destination).map(|entry| *entry);
        if let Some(delay) = delay {
            if !timeout.is_immediate() && delay >= timeout.duration() {
                tokio::time::sleep(timeout.duration()).await;
                return Err(TransportError::Timeout(timeout.duration()));
            }
            tokio::time::sleep(delay).await;
        }

        let origin = Origin::new(self.local.clone());
        let reply = listener.on_receive(&data, &origin);

        if timeout.is_immediate() {
            return Ok(());
        }

        let Some(reply) = reply else {
            debug!(%destination, "exchange closed without a reply");
            return Err(TransportError::ConnectionClosed);
        };

        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                let reply_origin = Origin {
                    peer: destination.clone(),
                    exchange_id: origin.exchange_id,
                };
                // Replies to replies are not part of the exchange.
                let _ = handler.on_receive(&reply.data, &reply_origin);
            }
            None => warn!(%destination, "reply dropped: no receive handler registered"),
        }

        Ok(())
    }
}

/// Produces a fresh [`MemoryTransport`] per call.
#[derive(Clone)]
pub struct MemoryTransportFactory {
    network: Arc<MemoryNetwork>,
    local: Endpoint,
}

impl TransportFactory for MemoryTransportFactory {
    type Transport = MemoryTransport;

    fn create(&self) -> MemoryTransport {
        self.network.transport(self.local.clone())
    }
}
