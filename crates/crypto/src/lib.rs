//! Cryptographic primitives for vault RPC envelopes.
//!
//! The envelope codec treats these as black boxes through the
//! [`CryptoProvider`] trait. [`KeyPairProvider`] is the concrete provider:
//! ed25519 signatures and x25519 sealed boxes between a local node and one
//! peer.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod keys;
mod provider;
pub mod sealed;

pub use error::{CryptoError, CryptoResult};
pub use keys::{NodeKeys, PEER_KEYS_LEN, PeerKeys};
pub use provider::{CryptoProvider, KeyPairProvider};
