//! Transport abstraction for the vault RPC layer.
//!
//! A transport moves opaque byte strings between endpoints. It does not know
//! about message types, envelopes or security flags; those belong to the
//! dispatch layer sitting on top of it.
//!
//! Each exchange is a single request followed by at most one reply:
//! - [`Transport::send`] delivers a payload and waits up to the supplied
//!   [`Timeout`] for the reply, which is handed to the transport's registered
//!   [`ReceiveHandler`].
//! - On the listening side every inbound payload is handed to a
//!   [`ReceiveHandler`], whose optional [`Reply`] is written back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

pub use error::{TransportError, TransportResult};

/// Address of a peer as understood by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(String);

impl Endpoint {
    /// Create an endpoint from any address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the endpoint as a socket address.
    pub fn socket_addr(&self) -> TransportResult<SocketAddr> {
        self.0
            .parse()
            .map_err(|_| TransportError::InvalidEndpoint(self.0.clone()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Endpoint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(value: SocketAddr) -> Self {
        Self(value.to_string())
    }
}

/// Metadata describing where an inbound payload came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// The remote endpoint.
    pub peer: Endpoint,
    /// Identifier of the exchange the payload arrived on.
    pub exchange_id: Uuid,
}

impl Origin {
    /// Origin for a payload received from `peer` on a fresh exchange.
    #[must_use]
    pub fn new(peer: Endpoint) -> Self {
        Self {
            peer,
            exchange_id: Uuid::new_v4(),
        }
    }
}

/// How long a transport keeps an exchange open.
///
/// [`Timeout::IMMEDIATE`] means no reply is expected: the exchange is closed
/// as soon as the payload is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeout(Duration);

impl Timeout {
    /// Close the exchange without waiting.
    pub const IMMEDIATE: Self = Self(Duration::ZERO);

    /// A finite wait.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// A finite wait in milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Whether this is the immediate timeout.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        self.0.is_zero()
    }

    /// The wait as a duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

/// Payload written back on the exchange a request arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Bytes to send.
    pub data: Bytes,
    /// How long to keep the exchange open after writing.
    pub timeout: Timeout,
}

/// Receives every payload arriving on a transport.
pub trait ReceiveHandler: Send + Sync + 'static {
    /// Handle one inbound payload, optionally producing a reply.
    fn on_receive(&self, data: &[u8], origin: &Origin) -> Option<Reply>;
}

impl<F> ReceiveHandler for F
where
    F: Fn(&[u8], &Origin) -> Option<Reply> + Send + Sync + 'static,
{
    fn on_receive(&self, data: &[u8], origin: &Origin) -> Option<Reply> {
        self(data, origin)
    }
}

/// Outbound side of a transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Register the handler that receives replies arriving on this transport.
    ///
    /// A later registration replaces the earlier one.
    fn set_receive_handler(&self, handler: Arc<dyn ReceiveHandler>);

    /// Deliver `data` to `destination`.
    ///
    /// With a finite `timeout` the exchange stays open until a reply arrives
    /// or the timeout expires; the reply is passed to the receive handler
    /// before this returns. With [`Timeout::IMMEDIATE`] no reply is awaited.
    async fn send(
        &self,
        destination: &Endpoint,
        data: Bytes,
        timeout: Timeout,
    ) -> TransportResult<()>;
}

/// Creates independent transports, one per outbound call.
pub trait TransportFactory: Send + Sync + 'static {
    /// Transport produced by this factory.
    type Transport: Transport;

    /// Create a fresh transport that shares nothing with previous ones.
    fn create(&self) -> Self::Transport;
}
