use thiserror::Error;
use vault_crypto::CryptoError;
use vault_rpc::CallStatus;
use vault_transport::TransportError;

/// Node error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid node configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Key material could not be loaded
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// RPC layer error
    #[error(transparent)]
    Rpc(#[from] vault_rpc::Error),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A client call did not succeed
    #[error("call failed: {0}")]
    Call(CallStatus),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for node operations
pub type Result<T> = std::result::Result<T, Error>;
