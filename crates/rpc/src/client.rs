//! Caller side of an RPC.
//!
//! Every call builds its own transport and [`MessageHandler`], subscribes the
//! response path, sends the wrapped request and keeps the completion callback
//! until the exchange ends. Whatever happens on the wire, the callback fires
//! exactly once.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use vault_transport::{Endpoint, Transport, TransportError, TransportFactory};

use crate::context::RpcContext;
use crate::handler::MessageHandler;
use crate::message::{Operation, ServiceGroup};

/// How a call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    /// A well-formed reply was dispatched.
    Success,
    /// The transport could not complete the exchange.
    DeliveryFailure(TransportError),
    /// The exchange finished without a reply that survived dispatch.
    NoValidReply,
    /// The request could not be prepared locally.
    RequestRejected(String),
}

impl CallStatus {
    /// Whether the call produced a response.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::DeliveryFailure(error) => write!(f, "delivery failure: {error}"),
            Self::NoValidReply => f.write_str("no valid reply"),
            Self::RequestRejected(reason) => write!(f, "request rejected: {reason}"),
        }
    }
}

type Callback<R> = Box<dyn FnOnce(CallStatus, R) + Send>;

/// Holds a callback until its first completion.
struct Completion<R> {
    callback: Mutex<Option<Callback<R>>>,
}

impl<R> Completion<R> {
    fn new(callback: Callback<R>) -> Arc<Self> {
        Arc::new(Self {
            callback: Mutex::new(Some(callback)),
        })
    }

    /// Fire the callback if it has not fired yet.
    fn complete(&self, status: CallStatus, value: R) -> bool {
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                callback(status, value);
                true
            }
            None => false,
        }
    }
}

/// Issues calls for the operations of service group `G`.
pub struct RpcClient<G, F> {
    context: Arc<RpcContext>,
    factory: Arc<F>,
    _group: PhantomData<fn() -> G>,
}

impl<G, F> Clone for RpcClient<G, F> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            factory: Arc::clone(&self.factory),
            _group: PhantomData,
        }
    }
}

impl<G, F> fmt::Debug for RpcClient<G, F>
where
    G: ServiceGroup,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("group", &G::NAME)
            .finish_non_exhaustive()
    }
}

impl<G, F> RpcClient<G, F>
where
    G: ServiceGroup,
    F: TransportFactory,
{
    /// Client creating one transport per call from `factory`.
    #[must_use]
    pub fn new(context: Arc<RpcContext>, factory: F) -> Self {
        Self {
            context,
            factory: Arc::new(factory),
            _group: PhantomData,
        }
    }

    /// Shared registry, codec and policies.
    #[must_use]
    pub const fn context(&self) -> &Arc<RpcContext> {
        &self.context
    }

    /// Start a call of `O` and return immediately.
    ///
    /// `callback` receives the decoded response on success and a default
    /// response with a failure status otherwise.
    pub fn call<O>(
        &self,
        destination: Endpoint,
        request: O::Request,
        callback: impl FnOnce(CallStatus, O::Response) + Send + 'static,
    ) -> JoinHandle<()>
    where
        O: Operation<Group = G>,
    {
        let client = self.clone();
        tokio::spawn(async move {
            client
                .exchange::<O>(destination, request, Box::new(callback))
                .await;
        })
    }

    /// Perform a call of `O` and wait for its outcome.
    pub async fn request<O>(
        &self,
        destination: Endpoint,
        request: O::Request,
    ) -> (CallStatus, O::Response)
    where
        O: Operation<Group = G>,
    {
        let (tx, rx) = oneshot::channel();
        self.exchange::<O>(
            destination,
            request,
            Box::new(move |status, response| {
                let _ = tx.send((status, response));
            }),
        )
        .await;

        rx.await
            .unwrap_or_else(|_| (CallStatus::NoValidReply, O::Response::default()))
    }

    #[instrument(skip_all, fields(group = G::NAME, operation = O::NAME, %destination))]
    async fn exchange<O>(
        &self,
        destination: Endpoint,
        request: O::Request,
        callback: Callback<O::Response>,
    ) where
        O: Operation<Group = G>,
    {
        let completion = Completion::new(callback);
        let transport = self.factory.create();
        let handler = Arc::new(MessageHandler::new(Arc::clone(&self.context)));

        let on_reply = Arc::clone(&completion);
        let subscribed = handler.on_response::<O, _>(move |_origin, response| {
            on_reply.complete(CallStatus::Success, response.clone());
        });
        if let Err(error) = subscribed {
            completion.complete(
                CallStatus::RequestRejected(error.to_string()),
                O::Response::default(),
            );
            return;
        }
        transport.set_receive_handler(handler.clone());

        let bytes = match handler.wrap_request::<O>(&request) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "failed to wrap request");
                completion.complete(
                    CallStatus::RequestRejected(error.to_string()),
                    O::Response::default(),
                );
                return;
            }
        };

        let status = match transport
            .send(&destination, bytes, self.context.timeouts().initial())
            .await
        {
            Ok(()) => CallStatus::NoValidReply,
            Err(error) => {
                warn!(%error, "exchange failed");
                CallStatus::DeliveryFailure(error)
            }
        };

        if completion.complete(status, O::Response::default()) {
            debug!("call completed without a valid reply");
        }
    }
}
