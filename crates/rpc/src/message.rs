//! Typed messages and operations.

use std::fmt::Debug;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::codec;
use crate::error::CodecError;
use crate::message_type::OperationDefinition;

/// A request or response schema.
pub trait Message: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Whether a decoded value carries everything a handler needs.
    ///
    /// Values that parse but fail this check are dropped like malformed bytes.
    fn is_well_formed(&self) -> bool {
        true
    }

    /// Serialize to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        codec::encode(self)
    }

    /// Parse from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode into this schema.
    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        codec::decode(data)
    }
}

/// A named cluster of related operations.
pub trait ServiceGroup: Send + Sync + 'static {
    /// Group name used in the message-type table and configuration.
    const NAME: &'static str;

    /// Operations of the group in declaration order.
    const OPERATIONS: &'static [OperationDefinition];
}

/// One RPC: a request schema, a response schema and its place in a group.
pub trait Operation: Send + Sync + 'static {
    /// Group the operation belongs to.
    type Group: ServiceGroup;
    /// Request schema.
    type Request: Message;
    /// Response schema. The default value is what a failed call reports.
    type Response: Message + Default;

    /// Operation name, unique within the group.
    const NAME: &'static str;
    /// One-line human description.
    const DESCRIPTION: &'static str;

    /// Static definition of the operation.
    #[must_use]
    fn definition() -> OperationDefinition {
        OperationDefinition::new(<Self::Group as ServiceGroup>::NAME, Self::NAME, Self::DESCRIPTION)
    }
}
