//! Envelope wrapping and unwrapping.
//!
//! Envelopes are tagged COSE_Sign1 structures. The protected header carries
//! the envelope version, the message type and the security flags, so a
//! receiver learns the type before touching the payload and a signature
//! covers all three. Encrypted payloads are sealed before signing.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use coset::{
    CoseSign1, CoseSign1Builder, Header, HeaderBuilder, Label, TaggedCborSerializable,
    cbor::value::Value, iana,
};
use tracing::debug;
use vault_crypto::CryptoProvider;

use crate::error::{CodecError, Error, PolicyViolation, Result};
use crate::message_type::MessageType;

/// Current envelope layout version.
pub const ENVELOPE_VERSION: u64 = 1;

const VERSION_LABEL: &str = "v";
const TYPE_LABEL: &str = "t";
const FLAGS_LABEL: &str = "f";

/// Security properties of one envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SecurityFlags {
    /// The envelope carries a signature over header and payload.
    pub signed: bool,
    /// The payload is encrypted to the receiver.
    pub asymmetric_encrypted: bool,
}

impl SecurityFlags {
    const SIGNED_BIT: u8 = 0b01;
    const ENCRYPTED_BIT: u8 = 0b10;

    /// Neither signed nor encrypted.
    pub const NONE: Self = Self {
        signed: false,
        asymmetric_encrypted: false,
    };

    /// Signed and encrypted.
    pub const SIGNED_AND_ENCRYPTED: Self = Self {
        signed: true,
        asymmetric_encrypted: true,
    };

    /// Wire representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.signed {
            bits |= Self::SIGNED_BIT;
        }
        if self.asymmetric_encrypted {
            bits |= Self::ENCRYPTED_BIT;
        }
        bits
    }

    /// Parse the wire representation, rejecting unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !(Self::SIGNED_BIT | Self::ENCRYPTED_BIT) != 0 {
            return None;
        }
        Some(Self {
            signed: bits & Self::SIGNED_BIT != 0,
            asymmetric_encrypted: bits & Self::ENCRYPTED_BIT != 0,
        })
    }
}

/// An unwrapped envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Schema of the payload.
    pub message_type: MessageType,
    /// Serialized payload, already decrypted.
    pub payload: Bytes,
    /// Signature as received; empty when unsigned.
    pub signature: Bytes,
    /// Flags as received.
    pub flags: SecurityFlags,
}

/// Wraps payloads into envelopes and back.
#[derive(Clone, Default)]
pub struct EnvelopeCodec {
    crypto: Option<Arc<dyn CryptoProvider>>,
}

impl fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("crypto", &self.crypto.is_some())
            .finish()
    }
}

impl EnvelopeCodec {
    /// Codec using `crypto` for signing and encryption.
    #[must_use]
    pub fn new(crypto: Option<Arc<dyn CryptoProvider>>) -> Self {
        Self { crypto }
    }

    /// Whether a crypto provider is configured.
    #[must_use]
    pub const fn has_crypto(&self) -> bool {
        self.crypto.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn CryptoProvider>> {
        self.crypto.as_ref().ok_or_else(|| {
            Error::Configuration("security flags require a crypto provider".to_string())
        })
    }

    /// Frame `payload` as `message_type` with the requested protection.
    ///
    /// # Errors
    ///
    /// Fails when protection is requested without a provider, when a crypto
    /// primitive fails, or when the envelope cannot be serialized.
    pub fn wrap(
        &self,
        message_type: MessageType,
        payload: &[u8],
        flags: SecurityFlags,
    ) -> Result<Bytes> {
        let body = if flags.asymmetric_encrypted {
            self.provider()?.encrypt(payload)?
        } else {
            payload.to_vec()
        };

        let mut header = HeaderBuilder::new()
            .text_value(
                VERSION_LABEL.to_string(),
                Value::Integer(ENVELOPE_VERSION.into()),
            )
            .text_value(TYPE_LABEL.to_string(), Value::Integer(message_type.0.into()))
            .text_value(FLAGS_LABEL.to_string(), Value::Integer(flags.bits().into()));
        if flags.signed {
            header = header.algorithm(iana::Algorithm::EdDSA);
        }

        let mut sign1 = CoseSign1Builder::new()
            .protected(header.build())
            .payload(body)
            .build();

        if flags.signed {
            let to_sign = sign1.tbs_data(b"");
            sign1.signature = self.provider()?.sign(&to_sign)?;
        }

        sign1
            .to_tagged_vec()
            .map(Bytes::from)
            .map_err(|e| CodecError::SerializationFailed(e.to_string()).into())
    }

    /// Parse envelope bytes, verify any signature and decrypt the payload.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedEnvelope`] when the layout is unusable and
    /// [`Error::SecurityPolicyViolation`] when a signature does not verify.
    ///
    /// Without a provider a signature is carried through unchecked. Such a
    /// codec only serves permissive operations, which ignore signatures.
    pub fn unwrap(&self, bytes: &[u8]) -> Result<Envelope> {
        let sign1 = CoseSign1::from_tagged_slice(bytes)
            .map_err(|e| Error::MalformedEnvelope(e.to_string()))?;

        let header = &sign1.protected.header;
        let version = header_u64(header, VERSION_LABEL)?;
        if version != ENVELOPE_VERSION {
            return Err(Error::MalformedEnvelope(format!(
                "unsupported envelope version {version}"
            )));
        }

        let message_type = u32::try_from(header_u64(header, TYPE_LABEL)?)
            .map_err(|_| Error::MalformedEnvelope("message type out of range".to_string()))?;
        let flags = u8::try_from(header_u64(header, FLAGS_LABEL)?)
            .ok()
            .and_then(SecurityFlags::from_bits)
            .ok_or_else(|| Error::MalformedEnvelope("unknown security flags".to_string()))?;

        match (flags.signed, sign1.signature.is_empty()) {
            (true, true) => {
                return Err(Error::MalformedEnvelope(
                    "signed envelope carries no signature".to_string(),
                ));
            }
            (false, false) => {
                return Err(Error::MalformedEnvelope(
                    "unsigned envelope carries a signature".to_string(),
                ));
            }
            (true, false) => match self.crypto.as_ref() {
                Some(provider) => {
                    if !provider.verify(&sign1.tbs_data(b""), &sign1.signature) {
                        return Err(PolicyViolation::InvalidSignature.into());
                    }
                }
                None => debug!("no provider, signature left unverified"),
            },
            (false, true) => {}
        }

        let CoseSign1 {
            payload, signature, ..
        } = sign1;
        let body = payload
            .ok_or_else(|| Error::MalformedEnvelope("missing payload".to_string()))?;

        let payload = if flags.asymmetric_encrypted {
            let provider = self.crypto.as_ref().ok_or_else(|| {
                Error::MalformedEnvelope("encrypted payload but no provider".to_string())
            })?;
            provider
                .decrypt(&body)
                .map_err(|e| Error::MalformedEnvelope(format!("undecryptable payload: {e}")))?
        } else {
            body
        };

        Ok(Envelope {
            message_type: MessageType(message_type),
            payload: Bytes::from(payload),
            signature: Bytes::from(signature),
            flags,
        })
    }
}

fn header_u64(header: &Header, label: &str) -> Result<u64> {
    let value = header
        .rest
        .iter()
        .find_map(|(key, value)| match (key, value) {
            (Label::Text(key), Value::Integer(int)) if key == label => Some(*int),
            _ => None,
        })
        .ok_or_else(|| Error::MalformedEnvelope(format!("missing header field {label}")))?;

    u64::try_from(value)
        .map_err(|_| Error::MalformedEnvelope(format!("header field {label} is negative")))
}
