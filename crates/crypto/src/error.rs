//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type alias for cryptographic operations.
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Errors raised by a crypto provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material has the wrong length or encoding.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Encrypting a payload failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decrypting a payload failed.
    #[error("decryption failed: {0}")]
    Decryption(String),
}
