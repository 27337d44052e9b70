//! Node identities.
//!
//! A node holds an ed25519 signing key and an x25519 exchange secret. Peers
//! only ever see the public halves, bundled as [`PeerKeys`].

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey as ExchangePublic, StaticSecret};

use crate::error::{CryptoError, CryptoResult};

const SIGNING_INFO: &[u8] = b"vault-node signing key";
const EXCHANGE_INFO: &[u8] = b"vault-node exchange key";

/// Length of an encoded [`PeerKeys`] value.
pub const PEER_KEYS_LEN: usize = 64;

/// Private key material of a node.
pub struct NodeKeys {
    signing: SigningKey,
    exchange: StaticSecret,
}

impl NodeKeys {
    /// Generate fresh random keys.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
            exchange: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Derive both keys deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> CryptoResult<Self> {
        let hk = Hkdf::<Sha256>::new(None, seed);

        let mut signing = [0u8; 32];
        hk.expand(SIGNING_INFO, &mut signing)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let mut exchange = [0u8; 32];
        hk.expand(EXCHANGE_INFO, &mut exchange)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self {
            signing: SigningKey::from_bytes(&signing),
            exchange: StaticSecret::from(exchange),
        })
    }

    /// Derive keys from a hex-encoded 32-byte seed.
    pub fn from_hex_seed(seed: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(seed).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("seed must be 32 bytes, got {}", bytes.len())))?;
        Self::from_seed(&seed)
    }

    /// The public halves of these keys.
    #[must_use]
    pub fn public(&self) -> PeerKeys {
        PeerKeys {
            verifying: self.signing.verifying_key(),
            exchange: ExchangePublic::from(&self.exchange),
        }
    }

    pub(crate) const fn signing(&self) -> &SigningKey {
        &self.signing
    }

    pub(crate) const fn exchange(&self) -> &StaticSecret {
        &self.exchange
    }
}

impl fmt::Debug for NodeKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeKeys")
            .field("public", &self.public())
            .finish_non_exhaustive()
    }
}

/// Public keys of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerKeys {
    /// Verifies the peer's signatures.
    pub verifying: VerifyingKey,
    /// Target of payloads sealed for the peer.
    pub exchange: ExchangePublic,
}

impl PeerKeys {
    /// Encode as verifying key followed by exchange key.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PEER_KEYS_LEN] {
        let mut out = [0u8; PEER_KEYS_LEN];
        out[..32].copy_from_slice(self.verifying.as_bytes());
        out[32..].copy_from_slice(self.exchange.as_bytes());
        out
    }

    /// Decode the layout produced by [`PeerKeys::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PEER_KEYS_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "peer keys must be {PEER_KEYS_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let (verifying, exchange) = bytes.split_at(32);
        let verifying: [u8; 32] = verifying
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("verifying key".to_string()))?;
        let exchange: [u8; 32] = exchange
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("exchange key".to_string()))?;

        Ok(Self {
            verifying: VerifyingKey::from_bytes(&verifying)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
            exchange: ExchangePublic::from(exchange),
        })
    }

    /// Hex form used in configuration files.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse the hex form.
    pub fn from_hex(value: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(value).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_keys_are_deterministic() {
        let seed = [7u8; 32];
        let a = NodeKeys::from_seed(&seed).unwrap();
        let b = NodeKeys::from_seed(&seed).unwrap();
        assert_eq!(a.public(), b.public());

        let other = NodeKeys::from_seed(&[8u8; 32]).unwrap();
        assert_ne!(a.public(), other.public());
    }

    #[test]
    fn peer_keys_hex_round_trip() {
        let keys = NodeKeys::generate().public();
        assert_eq!(PeerKeys::from_hex(&keys.to_hex()).unwrap(), keys);
        assert!(PeerKeys::from_hex("abcd").is_err());
    }

    #[test]
    fn hex_seed_must_be_32_bytes() {
        assert!(NodeKeys::from_hex_seed(&"11".repeat(32)).is_ok());
        assert!(matches!(
            NodeKeys::from_hex_seed("1122"),
            Err(CryptoError::InvalidKey(_))
        ));
    }
}
