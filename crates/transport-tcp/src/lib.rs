//! TCP transport.
//!
//! Each exchange runs on its own connection: the client writes one
//! length-prefixed frame, the server answers with at most one frame and the
//! connection closes. Frames carry a big-endian `u32` length and are capped
//! at [`MAX_FRAME_SIZE`].

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use vault_transport::{
    Endpoint, Origin, ReceiveHandler, Timeout, Transport, TransportError, TransportFactory,
    TransportResult,
};

/// Largest frame accepted in either direction.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// TCP-specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Bound on each connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Connection attempts before giving up.
    pub retry_attempts: usize,
    /// Delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// How long the server waits for a complete request frame, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            retry_attempts: 3,
            retry_delay_ms: 500,
            read_timeout_ms: 10_000,
        }
    }
}

impl TcpConfig {
    /// Bound on each connection attempt.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Bound on receiving a request frame.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Read one frame.
///
/// A stream that ends before the length prefix yields
/// [`TransportError::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R) -> TransportResult<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => TransportError::ConnectionClosed,
            _ => e.into(),
        });
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(Bytes::from(data))
}

/// Write one frame.
pub async fn write_frame<W>(writer: &mut W, data: &[u8]) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    // Bounded by MAX_FRAME_SIZE above.
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Client side of the TCP transport.
pub struct TcpTransport {
    config: TcpConfig,
    handler: RwLock<Option<Arc<dyn ReceiveHandler>>>,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("config", &self.config)
            .field("has_handler", &self.handler.read().is_some())
            .finish()
    }
}

impl TcpTransport {
    /// Create a transport with no receive handler.
    #[must_use]
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            handler: RwLock::new(None),
        }
    }

    async fn connect(&self, addr: SocketAddr) -> TransportResult<TcpStream> {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = TransportError::Unreachable(addr.to_string());

        for attempt in 1..=attempts {
            debug!(%addr, attempt, attempts, "connecting");
            match timeout(self.config.connect_timeout(), TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => {
                    debug!(%addr, error = %e, "connection attempt failed");
                    last_error = TransportError::Unreachable(format!("{addr}: {e}"));
                }
                Err(_) => {
                    last_error = TransportError::Timeout(self.config.connect_timeout());
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn set_receive_handler(&self, handler: Arc<dyn ReceiveHandler>) {
        *self.handler.write() = Some(handler);
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn send(
        &self,
        destination: &Endpoint,
        data: Bytes,
        timeout_policy: Timeout,
    ) -> TransportResult<()> {
        let addr = destination.socket_addr()?;
        let mut stream = self.connect(addr).await?;
        write_frame(&mut stream, &data).await?;

        if timeout_policy.is_immediate() {
            let _ = stream.shutdown().await;
            return Ok(());
        }

        let reply = match timeout(timeout_policy.duration(), read_frame(&mut stream)).await {
            Ok(reply) => reply?,
            Err(_) => {
                debug!(%destination, "no reply within timeout");
                return Err(TransportError::Timeout(timeout_policy.duration()));
            }
        };

        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                let origin = Origin::new(destination.clone());
                // Replies to replies are not part of the exchange.
                let _ = handler.on_receive(&reply, &origin);
            }
            None => warn!(%destination, "reply dropped: no receive handler registered"),
        }

        Ok(())
    }
}

/// Produces a fresh [`TcpTransport`] per call.
#[derive(Debug, Clone, Default)]
pub struct TcpTransportFactory {
    config: TcpConfig,
}

impl TcpTransportFactory {
    /// Factory handing `config` to every transport.
    #[must_use]
    pub const fn new(config: TcpConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for TcpTransportFactory {
    type Transport = TcpTransport;

    fn create(&self) -> TcpTransport {
        TcpTransport::new(self.config.clone())
    }
}

/// Server side of the TCP transport.
pub struct TcpServer {
    listener: TcpListener,
    handler: Arc<dyn ReceiveHandler>,
    read_timeout: Duration,
}

impl std::fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpServer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl TcpServer {
    /// Bind `addr` and dispatch every received frame to `handler`.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, handler: Arc<dyn ReceiveHandler>) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handler,
            read_timeout: TcpConfig::default().read_timeout(),
        })
    }

    /// Close connections whose request frame does not arrive within `read_timeout`.
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Address actually bound.
    ///
    /// # Errors
    ///
    /// Fails if the socket was closed underneath.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start accepting connections in the background.
    ///
    /// # Errors
    ///
    /// Fails if the local address cannot be read.
    pub fn start(self) -> TransportResult<TcpServerHandle> {
        let local_addr = self.local_addr()?;
        info!("TCP server listening on {local_addr}");

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let Self {
            listener,
            handler,
            read_timeout,
        } = self;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                debug!(%addr, "accepted connection");
                                let handler = Arc::clone(&handler);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, addr, handler, read_timeout).await {
                                        warn!(%addr, error = %e, "failed to handle connection");
                                    }
                                });
                            }
                            Err(e) => {
                                error!(error = %e, "failed to accept connection");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("TCP server shutting down");
                        break;
                    }
                }
            }
        });

        Ok(TcpServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    handler: Arc<dyn ReceiveHandler>,
    read_timeout: Duration,
) -> TransportResult<()> {
    let request = match timeout(read_timeout, read_frame(&mut stream)).await {
        Ok(request) => request?,
        Err(_) => {
            let _ = stream.shutdown().await;
            return Err(TransportError::Timeout(read_timeout));
        }
    };
    let origin = Origin::new(Endpoint::from(addr));

    let Some(reply) = handler.on_receive(&request, &origin) else {
        debug!(%addr, "no reply, closing");
        let _ = stream.shutdown().await;
        return Ok(());
    };

    if reply.timeout.is_immediate() {
        write_frame(&mut stream, &reply.data).await?;
    } else {
        timeout(reply.timeout.duration(), write_frame(&mut stream, &reply.data))
            .await
            .map_err(|_| TransportError::Timeout(reply.timeout.duration()))??;
    }
    let _ = stream.shutdown().await;
    Ok(())
}

/// A running [`TcpServer`].
#[derive(Debug)]
pub struct TcpServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl TcpServerHandle {
    /// Address the server listens on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Endpoint clients use to reach the server.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to end.
    ///
    /// Exchanges already in progress run to completion.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!(error = %e, "accept loop ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip_through_a_buffer() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"frame").await.unwrap();
        assert_eq!(&buffer[..4], &5u32.to_be_bytes());

        let mut reader = buffer.as_slice();
        assert_eq!(read_frame(&mut reader).await.unwrap(), Bytes::from_static(b"frame"));
        assert_eq!(
            read_frame(&mut reader).await.unwrap_err(),
            TransportError::ConnectionClosed
        );
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let prefix = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes();
        let mut reader = &prefix[..];
        assert_eq!(
            read_frame(&mut reader).await.unwrap_err(),
            TransportError::FrameTooLarge {
                size: MAX_FRAME_SIZE + 1,
                max: MAX_FRAME_SIZE,
            }
        );
    }

    #[test]
    fn config_defaults() {
        let config = TcpConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
    }
}
