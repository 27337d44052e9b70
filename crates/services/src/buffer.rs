//! Message buffers through which clients reach each other.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Create a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBufferRequest {
    /// Buffer name.
    pub buffer_name: String,
    /// Public key of the owner.
    pub owner_public_key: Bytes,
}

/// Outcome of a creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBufferResponse {
    /// Whether the buffer was created.
    pub created: bool,
}

/// Replace the owner-controlled info of a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyBufferInfoRequest {
    /// Buffer name.
    pub buffer_name: String,
    /// New info, signed by the owner.
    pub info: Bytes,
}

/// Outcome of an info change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyBufferInfoResponse {
    /// Whether the info was replaced.
    pub modified: bool,
}

/// Drain the messages of a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBufferMessagesRequest {
    /// Buffer name.
    pub buffer_name: String,
}

/// Messages held by a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBufferMessagesResponse {
    /// Messages in arrival order.
    pub messages: Vec<Bytes>,
}

/// Leave a message in a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBufferMessageRequest {
    /// Buffer name.
    pub buffer_name: String,
    /// Message, encrypted to the owner.
    pub message: Bytes,
}

/// Outcome of a message drop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBufferMessageResponse {
    /// Whether the message was accepted.
    pub added: bool,
}

/// Drain the presence notices of a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBufferPresenceRequest {
    /// Buffer name.
    pub buffer_name: String,
}

/// Presence notices held by a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBufferPresenceResponse {
    /// Notices in arrival order.
    pub presence: Vec<Bytes>,
}

/// Leave a presence notice in a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBufferPresenceRequest {
    /// Buffer name.
    pub buffer_name: String,
    /// Notice, encrypted to the owner.
    pub presence: Bytes,
}

/// Outcome of a presence notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBufferPresenceResponse {
    /// Whether the notice was accepted.
    pub added: bool,
}

named_message!(
    CreateBufferRequest.buffer_name,
    ModifyBufferInfoRequest.buffer_name,
    GetBufferMessagesRequest.buffer_name,
    AddBufferMessageRequest.buffer_name,
    GetBufferPresenceRequest.buffer_name,
    AddBufferPresenceRequest.buffer_name,
);

plain_message!(
    CreateBufferResponse,
    ModifyBufferInfoResponse,
    GetBufferMessagesResponse,
    AddBufferMessageResponse,
    GetBufferPresenceResponse,
    AddBufferPresenceResponse,
);

service_group! {
    /// Buffer operations.
    group Buffer = "Buffer" {
        CreateBuffer => "Create a buffer.";
        ModifyBufferInfo => "Replace the owner info of a buffer.";
        GetBufferMessages => "Retrieve the messages held by a buffer.";
        AddBufferMessage => "Add a message to a buffer.";
        GetBufferPresence => "Retrieve the presence notices held by a buffer.";
        AddBufferPresence => "Add a presence notice to a buffer.";
    }
}
