//! Anonymous sealed boxes.
//!
//! A payload is sealed to a recipient's x25519 key using a fresh ephemeral
//! secret. The AES-256-GCM key is derived with HKDF-SHA256 from the shared
//! secret, salted with both public keys.
//!
//! Layout: `ephemeral public (32) || nonce (12) || ciphertext + tag`.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as ExchangePublic, StaticSecret};

use crate::error::{CryptoError, CryptoResult};

const INFO: &[u8] = b"vault-rpc sealed box v1";
const PUBLIC_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Seal `plaintext` so only the holder of `recipient`'s secret can open it.
pub fn seal(recipient: &ExchangePublic, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = ExchangePublic::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);

    let key = derive_key(shared.as_bytes(), &ephemeral_public, recipient)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Encryption("aead seal failed".to_string()))?;

    let mut out = Vec::with_capacity(PUBLIC_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a box produced by [`seal`] for the public key of `secret`.
pub fn open(secret: &StaticSecret, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
    if sealed.len() < PUBLIC_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Decryption(format!(
            "sealed box of {} bytes is too short",
            sealed.len()
        )));
    }

    let (ephemeral, rest) = sealed.split_at(PUBLIC_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let ephemeral: [u8; PUBLIC_LEN] = ephemeral
        .try_into()
        .map_err(|_| CryptoError::Decryption("ephemeral key".to_string()))?;
    let ephemeral_public = ExchangePublic::from(ephemeral);
    let recipient = ExchangePublic::from(secret);
    let shared = secret.diffie_hellman(&ephemeral_public);

    let key = derive_key(shared.as_bytes(), &ephemeral_public, &recipient)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("aead open failed".to_string()))
}

fn derive_key(
    shared: &[u8],
    ephemeral: &ExchangePublic,
    recipient: &ExchangePublic,
) -> CryptoResult<[u8; 32]> {
    let mut salt = [0u8; PUBLIC_LEN * 2];
    salt[..PUBLIC_LEN].copy_from_slice(ephemeral.as_bytes());
    salt[PUBLIC_LEN..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut key = [0u8; 32];
    hk.expand(INFO, &mut key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    Ok(key)
}
