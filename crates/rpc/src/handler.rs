//! Message dispatch core.
//!
//! A [`MessageHandler`] owns one type-erased dispatch entry per operation
//! that has subscribers. Each entry decodes the payload into the operation's
//! request or response type and fans it out to its subscribers in
//! subscription order. Message types outside the registry go to the base
//! dispatch layer unchanged.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, warn};
use vault_transport::{Origin, ReceiveHandler, Reply, Timeout};

use crate::context::RpcContext;
use crate::envelope::Envelope;
use crate::error::{CodecError, Error, Result};
use crate::message::{Message, Operation};
use crate::message_type::Direction;

/// Subscriber to the request path of operation `O`.
///
/// Writing the response slot produces the reply; the last write wins.
pub type RequestSubscriber<O> = Arc<
    dyn Fn(&Origin, &<O as Operation>::Request, &mut Option<<O as Operation>::Response>)
        + Send
        + Sync,
>;

/// Subscriber to the response path of operation `O`.
pub type ResponseSubscriber<O> = Arc<dyn Fn(&Origin, &<O as Operation>::Response) + Send + Sync>;

/// Outcome of dispatching one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutput {
    /// Wrapped reply envelope, if any.
    pub response: Option<Bytes>,
    /// Timeout the transport applies to the exchange.
    pub timeout: Timeout,
}

impl Default for DispatchOutput {
    fn default() -> Self {
        Self {
            response: None,
            timeout: Timeout::IMMEDIATE,
        }
    }
}

impl DispatchOutput {
    /// Reply for the transport, if a response was produced.
    #[must_use]
    pub fn into_reply(self) -> Option<Reply> {
        let timeout = self.timeout;
        self.response.map(|data| Reply { data, timeout })
    }
}

/// A dispatch layer.
///
/// [`MessageHandler`] implements this and accepts another implementation as
/// its base, so layers stack without knowing about each other.
pub trait Dispatcher: Send + Sync {
    /// Dispatch an unwrapped envelope.
    fn process_serialised_message(&self, envelope: &Envelope, origin: &Origin) -> DispatchOutput;
}

/// Base layer that owns no message types.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn process_serialised_message(&self, envelope: &Envelope, origin: &Origin) -> DispatchOutput {
        debug!(
            message_type = %envelope.message_type,
            peer = %origin.peer,
            "no layer owns message type, dropping"
        );
        DispatchOutput::default()
    }
}

/// Why a payload never reached its subscribers.
#[derive(Debug, Error)]
enum Rejection {
    #[error("malformed payload: {0}")]
    Malformed(CodecError),

    #[error("structurally incomplete payload")]
    Incomplete,

    #[error("response could not be encoded: {0}")]
    Unencodable(CodecError),
}

trait DispatchEntry: Any + Send + Sync {
    fn dispatch_request(
        &self,
        origin: &Origin,
        payload: &[u8],
    ) -> std::result::Result<Option<Bytes>, Rejection>;

    fn dispatch_response(&self, origin: &Origin, payload: &[u8]) -> std::result::Result<(), Rejection>;

    fn as_any(&self) -> &dyn Any;
}

struct TypedEntry<O: Operation> {
    requests: RwLock<Vec<RequestSubscriber<O>>>,
    responses: RwLock<Vec<ResponseSubscriber<O>>>,
    _operation: PhantomData<fn() -> O>,
}

impl<O: Operation> TypedEntry<O> {
    fn new() -> Self {
        Self {
            requests: RwLock::new(Vec::new()),
            responses: RwLock::new(Vec::new()),
            _operation: PhantomData,
        }
    }
}

fn decode<M: Message>(payload: &[u8]) -> std::result::Result<M, Rejection> {
    let value = M::from_bytes(payload).map_err(Rejection::Malformed)?;
    if !value.is_well_formed() {
        return Err(Rejection::Incomplete);
    }
    Ok(value)
}

/// Run one subscriber, containing any panic.
fn isolate(operation: &'static str, direction: Direction, position: usize, f: impl FnOnce()) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        warn!(
            operation,
            %direction,
            position,
            panic = %message,
            "subscriber panicked, continuing with the rest"
        );
    }
}

impl<O: Operation> DispatchEntry for TypedEntry<O> {
    fn dispatch_request(
        &self,
        origin: &Origin,
        payload: &[u8],
    ) -> std::result::Result<Option<Bytes>, Rejection> {
        let request: O::Request = decode(payload)?;
        let subscribers = self.requests.read().clone();

        let mut response = None;
        for (position, subscriber) in subscribers.iter().enumerate() {
            isolate(O::NAME, Direction::Request, position, || {
                subscriber(origin, &request, &mut response);
            });
        }

        response
            .map(|response| response.to_bytes())
            .transpose()
            .map_err(Rejection::Unencodable)
    }

    fn dispatch_response(&self, origin: &Origin, payload: &[u8]) -> std::result::Result<(), Rejection> {
        let response: O::Response = decode(payload)?;
        let subscribers = self.responses.read().clone();

        for (position, subscriber) in subscribers.iter().enumerate() {
            isolate(O::NAME, Direction::Response, position, || {
                subscriber(origin, &response);
            });
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dispatches envelopes of one registry to typed subscribers.
pub struct MessageHandler {
    context: Arc<RpcContext>,
    entries: RwLock<HashMap<usize, Arc<dyn DispatchEntry>>>,
    base: Arc<dyn Dispatcher>,
}

impl fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandler")
            .field("operations", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl MessageHandler {
    /// Handler whose base layer drops everything it does not own.
    #[must_use]
    pub fn new(context: Arc<RpcContext>) -> Self {
        Self::with_base(context, Arc::new(NullDispatcher))
    }

    /// Handler delegating unknown message types to `base`.
    #[must_use]
    pub fn with_base(context: Arc<RpcContext>, base: Arc<dyn Dispatcher>) -> Self {
        Self {
            context,
            entries: RwLock::new(HashMap::new()),
            base,
        }
    }

    /// Shared registry, codec and policies.
    #[must_use]
    pub const fn context(&self) -> &Arc<RpcContext> {
        &self.context
    }

    fn typed_entry<O: Operation>(&self) -> Result<Arc<dyn DispatchEntry>> {
        let definition = O::definition();
        let index = self
            .context
            .registry()
            .index_of(definition.group, definition.operation)
            .ok_or_else(|| Error::UnknownOperation {
                group: definition.group.to_string(),
                operation: definition.operation.to_string(),
            })?;

        let entry = Arc::clone(
            self.entries
                .write()
                .entry(index)
                .or_insert_with(|| Arc::new(TypedEntry::<O>::new()) as Arc<dyn DispatchEntry>),
        );

        if entry.as_any().downcast_ref::<TypedEntry<O>>().is_none() {
            return Err(Error::Configuration(format!(
                "{} is already registered with different schemas",
                definition.qualified_name()
            )));
        }
        Ok(entry)
    }

    /// Subscribe to requests of operation `O`.
    ///
    /// # Errors
    ///
    /// Fails if `O` is not in the registry.
    pub fn on_request<O, F>(&self, subscriber: F) -> Result<()>
    where
        O: Operation,
        F: Fn(&Origin, &O::Request, &mut Option<O::Response>) + Send + Sync + 'static,
    {
        let entry = self.typed_entry::<O>()?;
        if let Some(typed) = entry.as_any().downcast_ref::<TypedEntry<O>>() {
            typed.requests.write().push(Arc::new(subscriber));
        }
        Ok(())
    }

    /// Subscribe to responses of operation `O`.
    ///
    /// # Errors
    ///
    /// Fails if `O` is not in the registry.
    pub fn on_response<O, F>(&self, subscriber: F) -> Result<()>
    where
        O: Operation,
        F: Fn(&Origin, &O::Response) + Send + Sync + 'static,
    {
        let entry = self.typed_entry::<O>()?;
        if let Some(typed) = entry.as_any().downcast_ref::<TypedEntry<O>>() {
            typed.responses.write().push(Arc::new(subscriber));
        }
        Ok(())
    }

    /// Serialize and wrap a request of `O` under its security policy.
    ///
    /// # Errors
    ///
    /// Fails if `O` is unknown, or on codec or crypto failure.
    pub fn wrap_request<O: Operation>(&self, request: &O::Request) -> Result<Bytes> {
        let (ids, policy) = self.context.operation::<O>()?;
        let payload = request.to_bytes()?;
        self.context.codec().wrap(ids.request, &payload, policy.flags())
    }

    /// Serialize and wrap a response of `O` under its security policy.
    ///
    /// # Errors
    ///
    /// Fails if `O` is unknown, or on codec or crypto failure.
    pub fn wrap_response<O: Operation>(&self, response: &O::Response) -> Result<Bytes> {
        let (ids, policy) = self.context.operation::<O>()?;
        let payload = response.to_bytes()?;
        self.context.codec().wrap(ids.response, &payload, policy.flags())
    }

    /// Unwrap raw bytes from a transport and dispatch them.
    pub fn process_bytes(&self, data: &[u8], origin: &Origin) -> DispatchOutput {
        match self.context.codec().unwrap(data) {
            Ok(envelope) => self.process_serialised_message(&envelope, origin),
            Err(error) => {
                warn!(peer = %origin.peer, %error, "dropping envelope that failed to unwrap");
                DispatchOutput::default()
            }
        }
    }
}

impl Dispatcher for MessageHandler {
    fn process_serialised_message(&self, envelope: &Envelope, origin: &Origin) -> DispatchOutput {
        let mut output = DispatchOutput::default();

        let Some(resolved) = self.context.registry().resolve(envelope.message_type) else {
            debug!(message_type = %envelope.message_type, "delegating to base layer");
            return self.base.process_serialised_message(envelope, origin);
        };
        let definition = resolved.definition;
        let direction = resolved.direction;

        let policy = self.context.policy_for(definition);
        if let Err(violation) = policy.check(envelope) {
            warn!(
                group = definition.group,
                operation = definition.operation,
                %direction,
                %policy,
                %violation,
                peer = %origin.peer,
                "dropping envelope that violates security policy"
            );
            return output;
        }

        // Copies of a duplicated definition share the first copy's subscribers.
        let index = self
            .context
            .registry()
            .index_of(definition.group, definition.operation)
            .unwrap_or(resolved.index);
        let entry = self.entries.read().get(&index).cloned();
        let Some(entry) = entry else {
            debug!(
                group = definition.group,
                operation = definition.operation,
                %direction,
                "no subscribers, dropping"
            );
            return output;
        };

        match direction {
            Direction::Request => match entry.dispatch_request(origin, &envelope.payload) {
                Ok(Some(payload)) => {
                    let wrapped = self
                        .context
                        .registry()
                        .ids_at(resolved.index)
                        .ok_or_else(|| {
                            Error::Configuration(format!(
                                "no response type for {}",
                                definition.qualified_name()
                            ))
                        })
                        .and_then(|ids| {
                            self.context
                                .codec()
                                .wrap(ids.response, &payload, policy.flags())
                        });
                    match wrapped {
                        Ok(bytes) => output.response = Some(bytes),
                        Err(error) => error!(
                            group = definition.group,
                            operation = definition.operation,
                            %error,
                            "failed to wrap response"
                        ),
                    }
                }
                Ok(None) => {}
                Err(rejection) => warn!(
                    group = definition.group,
                    operation = definition.operation,
                    %rejection,
                    "dropping request"
                ),
            },
            Direction::Response => {
                if let Err(rejection) = entry.dispatch_response(origin, &envelope.payload) {
                    warn!(
                        group = definition.group,
                        operation = definition.operation,
                        %rejection,
                        "dropping response"
                    );
                }
            }
        }

        output.timeout = self
            .context
            .timeouts()
            .for_reply(output.response.is_some());
        output
    }
}

impl ReceiveHandler for MessageHandler {
    fn on_receive(&self, data: &[u8], origin: &Origin) -> Option<Reply> {
        self.process_bytes(data, origin).into_reply()
    }
}
