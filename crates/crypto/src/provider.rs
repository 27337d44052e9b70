//! Black-box crypto operations used by the envelope codec.

use ed25519_dalek::{Signature, Signer, Verifier};

use crate::error::CryptoResult;
use crate::keys::{NodeKeys, PeerKeys};
use crate::sealed;

/// Signing, verification and asymmetric encryption for one peer relationship.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Sign `data` with the local key.
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Check a signature produced by the peer.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;

    /// Encrypt for the peer.
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypt a payload the peer encrypted for us.
    fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Provider backed by local [`NodeKeys`] and the peer's [`PeerKeys`].
#[derive(Debug)]
pub struct KeyPairProvider {
    local: NodeKeys,
    peer: PeerKeys,
}

impl KeyPairProvider {
    /// Provider for traffic between `local` and `peer`.
    #[must_use]
    pub const fn new(local: NodeKeys, peer: PeerKeys) -> Self {
        Self { local, peer }
    }

    /// Provider whose peer is the local node itself.
    #[must_use]
    pub fn loopback(local: NodeKeys) -> Self {
        let peer = local.public();
        Self { local, peer }
    }

    /// Public keys of the local node.
    #[must_use]
    pub fn local_public(&self) -> PeerKeys {
        self.local.public()
    }
}

impl CryptoProvider for KeyPairProvider {
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.local.signing().sign(data).to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.peer.verifying.verify(data, &signature).is_ok()
    }

    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        sealed::seal(&self.peer.exchange, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        sealed::open(self.local.exchange(), ciphertext)
    }
}
