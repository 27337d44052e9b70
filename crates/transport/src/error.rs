//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors surfaced by a transport while delivering an exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Nothing is listening at the destination.
    #[error("endpoint {0} is unreachable")]
    Unreachable(String),

    /// No reply arrived within the exchange timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The remote side closed the exchange without replying.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,

    /// The destination could not be interpreted by this transport.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A frame exceeded the transport's size limit.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Size of the offending frame.
        size: usize,
        /// Largest accepted frame.
        max: usize,
    },

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
