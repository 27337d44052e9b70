//! Callee side of an RPC.
//!
//! A service skeleton exposes one method per operation of its group. Binding
//! a skeleton subscribes each method to the request path of its operation;
//! whatever the method returns becomes the response slot.
//!
//! Methods run on the dispatch path. Work that cannot finish quickly belongs
//! on a spawned task, with the method returning `None` so the exchange closes
//! immediately.

use std::sync::Arc;

use vault_transport::Origin;

use crate::error::Result;
use crate::handler::MessageHandler;
use crate::message::Operation;

/// Subscribe `method` of `skeleton` to requests of `O`.
///
/// # Errors
///
/// Fails if `O` is not in the handler's registry.
pub fn bind_operation<O, S, M>(handler: &MessageHandler, skeleton: Arc<S>, method: M) -> Result<()>
where
    O: Operation,
    S: Send + Sync + ?Sized + 'static,
    M: Fn(&S, &Origin, &O::Request) -> Option<O::Response> + Send + Sync + 'static,
{
    handler.on_request::<O, _>(move |origin, request, response| {
        if let Some(produced) = method(&*skeleton, origin, request) {
            *response = Some(produced);
        }
    })
}
