//! Message dispatch and RPC calling core for vault service groups.
//!
//! Every service group shares one contract:
//!
//! - **Message types**: [`MessageTypeRegistry`] gives each operation a
//!   consecutive request/response pair of IDs above the base layer's range.
//! - **Envelopes**: [`EnvelopeCodec`] frames a payload with its type and
//!   [`SecurityFlags`], signing and encrypting as requested.
//! - **Dispatch**: [`MessageHandler`] checks the [`SecurityPolicy`], decodes
//!   the payload, fans it out to subscribers and wraps any response. Unknown
//!   types fall through to a base [`Dispatcher`].
//! - **Calls**: [`RpcClient`] runs one exchange per call on its own transport
//!   and handler and reports through a callback that fires exactly once.
//! - **Skeletons**: [`bind_operation`] attaches a callee method to the
//!   request path of its operation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod codec;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod message;
pub mod message_type;
pub mod security;
pub mod service;
pub mod timeout;

pub use client::{CallStatus, RpcClient};
pub use config::{DEFAULT_BASE_LAYER_MAX_TYPE, RpcConfig, TimeoutConfig};
pub use context::RpcContext;
pub use envelope::{ENVELOPE_VERSION, Envelope, EnvelopeCodec, SecurityFlags};
pub use error::{CodecError, Error, PolicyViolation, Result};
pub use handler::{DispatchOutput, Dispatcher, MessageHandler, NullDispatcher};
pub use message::{Message, Operation, ServiceGroup};
pub use message_type::{
    Direction, MessageType, MessageTypeRegistry, OperationDefinition, OperationIds,
};
pub use security::{PolicyTable, SecurityPolicy};
pub use service::bind_operation;
pub use timeout::{DEFAULT_INITIAL_TIMEOUT, TimeoutPolicy};

pub use vault_transport::{Endpoint, Origin, Timeout};
