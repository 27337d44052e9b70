//! Error types for the dispatch and calling core.

use std::io;

use thiserror::Error;
use vault_crypto::CryptoError;
use vault_transport::TransportError;

/// Result type alias for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for RPC operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Envelope bytes could not be parsed into their fields.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A well-formed envelope does not satisfy the security policy.
    #[error("Security policy violation: {0}")]
    SecurityPolicyViolation(#[from] PolicyViolation),

    /// The operation is not part of the allocated message-type space.
    #[error("Unknown operation {group}.{operation}")]
    UnknownOperation {
        /// Service group name.
        group: String,
        /// Operation name.
        operation: String,
    },

    /// Payload serialization failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A cryptographic primitive failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The transport could not complete the exchange.
    #[error("Delivery failure: {0}")]
    DeliveryFailure(#[from] TransportError),

    /// Configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Ways an envelope can fail its security checks.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    /// A signature is required but the envelope carries none.
    #[error("signature required but absent")]
    MissingSignature,

    /// Asymmetric encryption is required but the payload is plain.
    #[error("asymmetric encryption required but absent")]
    NotEncrypted,

    /// The signature does not match the envelope.
    #[error("signature does not verify")]
    InvalidSignature,
}

/// Codec-related errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("Failed to serialize: {0}")]
    SerializationFailed(String),

    /// Deserialization failed.
    #[error("Failed to deserialize: {0}")]
    DeserializationFailed(String),
}

impl From<ciborium::de::Error<io::Error>> for CodecError {
    fn from(err: ciborium::de::Error<io::Error>) -> Self {
        Self::DeserializationFailed(err.to_string())
    }
}

impl From<ciborium::ser::Error<io::Error>> for CodecError {
    fn from(err: ciborium::ser::Error<io::Error>) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}
