//! Dispatch behaviour of [`MessageHandler`] without a transport.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use vault_rpc::{
    DispatchOutput, Dispatcher, Envelope, EnvelopeCodec, MessageHandler, MessageType, Message,
    SecurityFlags, ServiceGroup, Timeout,
};
use vault_transport::{Endpoint, Origin};

use common::*;

fn origin() -> Origin {
    Origin::new(Endpoint::new("vault-a"))
}

#[test]
fn scenario_allocates_consecutive_pairs() {
    let context = permissive();
    let store = context.registry().ids("Chunk", "StoreChunk").unwrap();
    let get = context.registry().ids("Chunk", "GetChunk").unwrap();

    assert_eq!((store.request, store.response), (MessageType(101), MessageType(102)));
    assert_eq!((get.request, get.response), (MessageType(103), MessageType(104)));
    assert_eq!(context.registry().max_type(), MessageType(104));
}

#[tokio::test]
async fn empty_response_closes_immediately() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(permissive());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    handler
        .on_request::<GetChunk, _>(move |_, request, _| {
            assert_eq!(request.name, "alpha");
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let bytes = handler
        .wrap_request::<GetChunk>(&GetChunkRequest { name: "alpha".into() })
        .unwrap();
    let output = handler.process_bytes(&bytes, &origin());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(output.response, None);
    assert_eq!(output.timeout, Timeout::IMMEDIATE);
}

#[tokio::test]
async fn populated_response_keeps_exchange_open() {
    let _ = tracing_subscriber::fmt::try_init();

    let context = permissive();
    let handler = MessageHandler::new(Arc::clone(&context));
    handler
        .on_request::<GetChunk, _>(|_, _, response| {
            *response = Some(GetChunkResponse {
                data: b"chunk".to_vec(),
            });
        })
        .unwrap();

    let bytes = handler
        .wrap_request::<GetChunk>(&GetChunkRequest { name: "alpha".into() })
        .unwrap();
    let output = handler.process_bytes(&bytes, &origin());

    assert_eq!(output.timeout, Timeout::new(INITIAL));
    let reply = context.codec().unwrap(&output.response.unwrap()).unwrap();
    assert_eq!(reply.message_type, MessageType(104));
    assert_eq!(reply.flags, SecurityFlags::NONE);
    let decoded = GetChunkResponse::from_bytes(&reply.payload).unwrap();
    assert_eq!(decoded.data, b"chunk");
}

#[tokio::test]
async fn strict_drops_unsigned_envelopes() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(strict(loopback()));
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    handler
        .on_request::<StoreChunk, _>(move |_, _, response| {
            seen.fetch_add(1, Ordering::SeqCst);
            *response = Some(StoreChunkResponse { stored: true });
        })
        .unwrap();

    let request = StoreChunkRequest {
        name: "alpha".into(),
        data: vec![1, 2, 3],
    };
    let unsigned = EnvelopeCodec::default()
        .wrap(MessageType(101), &request.to_bytes().unwrap(), SecurityFlags::NONE)
        .unwrap();

    let output = handler.process_bytes(&unsigned, &origin());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(output, DispatchOutput::default());

    let signed = handler.wrap_request::<StoreChunk>(&request).unwrap();
    let output = handler.process_bytes(&signed, &origin());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(output.response.is_some());
}

#[tokio::test]
async fn strict_replies_are_signed_and_encrypted() {
    let _ = tracing_subscriber::fmt::try_init();

    let context = strict(loopback());
    let handler = MessageHandler::new(Arc::clone(&context));
    handler
        .on_request::<StoreChunk, _>(|_, _, response| {
            *response = Some(StoreChunkResponse { stored: true });
        })
        .unwrap();

    let bytes = handler
        .wrap_request::<StoreChunk>(&StoreChunkRequest {
            name: "alpha".into(),
            data: vec![9],
        })
        .unwrap();
    let output = handler.process_bytes(&bytes, &origin());

    let reply = context.codec().unwrap(&output.response.unwrap()).unwrap();
    assert_eq!(reply.message_type, MessageType(102));
    assert_eq!(reply.flags, SecurityFlags::SIGNED_AND_ENCRYPTED);
    assert!(!reply.signature.is_empty());
}

#[tokio::test]
async fn permissive_accepts_unsigned_envelopes() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(permissive());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    handler
        .on_request::<StoreChunk, _>(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let payload = StoreChunkRequest {
        name: "alpha".into(),
        data: Vec::new(),
    }
    .to_bytes()
    .unwrap();
    let bytes = EnvelopeCodec::default()
        .wrap(MessageType(101), &payload, SecurityFlags::NONE)
        .unwrap();
    handler.process_bytes(&bytes, &origin());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

struct RecordingBase {
    seen: Mutex<Vec<Envelope>>,
    output: DispatchOutput,
}

impl Dispatcher for RecordingBase {
    fn process_serialised_message(&self, envelope: &Envelope, _origin: &Origin) -> DispatchOutput {
        self.seen.lock().push(envelope.clone());
        self.output.clone()
    }
}

#[tokio::test]
async fn unknown_types_go_to_base_unchanged() {
    let _ = tracing_subscriber::fmt::try_init();

    let base = Arc::new(RecordingBase {
        seen: Mutex::new(Vec::new()),
        output: DispatchOutput {
            response: Some(Bytes::from_static(b"base reply")),
            timeout: Timeout::from_millis(42),
        },
    });
    let handler = MessageHandler::with_base(permissive(), base.clone());

    let envelope = Envelope {
        message_type: MessageType(7),
        payload: Bytes::from_static(b"opaque"),
        signature: Bytes::new(),
        flags: SecurityFlags::NONE,
    };
    let output = handler.process_serialised_message(&envelope, &origin());

    assert_eq!(output, base.output);
    assert_eq!(base.seen.lock().as_slice(), &[envelope]);
}

#[tokio::test]
async fn types_above_the_registry_also_delegate() {
    let base = Arc::new(RecordingBase {
        seen: Mutex::new(Vec::new()),
        output: DispatchOutput::default(),
    });
    let handler = MessageHandler::with_base(permissive(), base.clone());

    let envelope = Envelope {
        message_type: MessageType(105),
        payload: Bytes::new(),
        signature: Bytes::new(),
        flags: SecurityFlags::NONE,
    };
    handler.process_serialised_message(&envelope, &origin());
    assert_eq!(base.seen.lock().len(), 1);
}

#[tokio::test]
async fn malformed_and_incomplete_payloads_are_dropped() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(permissive());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    handler
        .on_request::<GetChunk, _>(move |_, _, response| {
            seen.fetch_add(1, Ordering::SeqCst);
            *response = Some(GetChunkResponse::default());
        })
        .unwrap();

    let codec = EnvelopeCodec::default();
    let garbage = codec
        .wrap(MessageType(103), b"\xff\xfe not cbor", SecurityFlags::NONE)
        .unwrap();
    assert_eq!(handler.process_bytes(&garbage, &origin()), DispatchOutput::default());

    let nameless = GetChunkRequest::default().to_bytes().unwrap();
    let incomplete = codec
        .wrap(MessageType(103), &nameless, SecurityFlags::NONE)
        .unwrap();
    assert_eq!(handler.process_bytes(&incomplete, &origin()), DispatchOutput::default());

    assert_eq!(handler.process_bytes(b"not an envelope", &origin()), DispatchOutput::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn subscribers_run_in_order_and_panics_are_contained() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(permissive());
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    handler
        .on_request::<GetChunk, _>(move |_, _, response| {
            first.lock().push(1);
            *response = Some(GetChunkResponse { data: vec![1] });
        })
        .unwrap();
    handler
        .on_request::<GetChunk, _>(|_, _, _| panic!("subscriber failure"))
        .unwrap();
    let third = Arc::clone(&order);
    handler
        .on_request::<GetChunk, _>(move |_, _, response| {
            third.lock().push(3);
            *response = Some(GetChunkResponse { data: vec![3] });
        })
        .unwrap();

    let bytes = handler
        .wrap_request::<GetChunk>(&GetChunkRequest { name: "alpha".into() })
        .unwrap();
    let output = handler.process_bytes(&bytes, &origin());

    assert_eq!(order.lock().as_slice(), &[1, 3]);
    let reply = handler
        .context()
        .codec()
        .unwrap(&output.response.unwrap())
        .unwrap();
    assert_eq!(GetChunkResponse::from_bytes(&reply.payload).unwrap().data, vec![3]);
}

#[tokio::test]
async fn responses_reach_response_subscribers_only() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(permissive());
    let received = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&received);
    handler
        .on_response::<StoreChunk, _>(move |_, response| {
            *slot.lock() = Some(response.clone());
        })
        .unwrap();
    let requests = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&requests);
    handler
        .on_request::<StoreChunk, _>(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let bytes = handler
        .wrap_response::<StoreChunk>(&StoreChunkResponse { stored: true })
        .unwrap();
    let output = handler.process_bytes(&bytes, &origin());

    assert_eq!(output, DispatchOutput::default());
    assert_eq!(*received.lock(), Some(StoreChunkResponse { stored: true }));
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handlers_layer_over_each_other() {
    let _ = tracing_subscriber::fmt::try_init();

    let lower = Arc::new(MessageHandler::new(permissive()));
    lower
        .on_request::<GetChunk, _>(|_, _, response| {
            *response = Some(GetChunkResponse { data: vec![4] });
        })
        .unwrap();

    let mut upper_config = config(vault_rpc::SecurityPolicy::Permissive);
    upper_config.base_layer_max_type = lower.context().registry().max_type().0;
    let upper_context = Arc::new(
        vault_rpc::RpcContext::new(&upper_config, Chunk::OPERATIONS, None).unwrap(),
    );
    let upper = MessageHandler::with_base(Arc::clone(&upper_context), lower.clone());

    assert_eq!(
        upper_context.registry().ids("Chunk", "GetChunk").unwrap().request,
        MessageType(107)
    );

    let bytes = lower
        .wrap_request::<GetChunk>(&GetChunkRequest { name: "alpha".into() })
        .unwrap();
    let output = upper.process_bytes(&bytes, &origin());

    assert_eq!(output.timeout, Timeout::new(INITIAL));
    let reply = lower.context().codec().unwrap(&output.response.unwrap()).unwrap();
    assert_eq!(reply.message_type, MessageType(104));
}

#[test]
fn unknown_operations_cannot_subscribe() {
    struct Other;
    impl vault_rpc::ServiceGroup for Other {
        const NAME: &'static str = "Other";
        const OPERATIONS: &'static [vault_rpc::OperationDefinition] = &[];
    }
    struct Ping;
    impl vault_rpc::Operation for Ping {
        type Group = Other;
        type Request = GetChunkRequest;
        type Response = GetChunkResponse;
        const NAME: &'static str = "Ping";
        const DESCRIPTION: &'static str = "Not registered.";
    }

    let handler = MessageHandler::new(permissive());
    let error = handler.on_request::<Ping, _>(|_, _, _| {}).unwrap_err();
    assert!(matches!(error, vault_rpc::Error::UnknownOperation { .. }));
    assert!(handler.wrap_request::<Ping>(&GetChunkRequest::default()).is_err());
}

#[test]
fn base_without_room_for_the_group_is_rejected() {
    let mut crowded = config(vault_rpc::SecurityPolicy::Permissive);
    crowded.base_layer_max_type = u32::MAX - 1;

    let error = vault_rpc::RpcContext::new(&crowded, Chunk::OPERATIONS, None).unwrap_err();
    assert!(matches!(error, vault_rpc::Error::Configuration(_)));
}

#[tokio::test]
async fn group_at_the_top_of_the_range_replies_with_the_last_type() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut top = config(vault_rpc::SecurityPolicy::Permissive);
    top.base_layer_max_type = u32::MAX - 4;
    let context = Arc::new(vault_rpc::RpcContext::new(&top, Chunk::OPERATIONS, None).unwrap());
    assert_eq!(context.registry().max_type(), MessageType(u32::MAX));

    let handler = MessageHandler::new(Arc::clone(&context));
    handler
        .on_request::<GetChunk, _>(|_, _, response| {
            *response = Some(GetChunkResponse { data: vec![1] });
        })
        .unwrap();

    let bytes = handler
        .wrap_request::<GetChunk>(&GetChunkRequest { name: "alpha".into() })
        .unwrap();
    let output = handler.process_bytes(&bytes, &origin());

    let reply = context.codec().unwrap(&output.response.unwrap()).unwrap();
    assert_eq!(reply.message_type, MessageType(u32::MAX));

    let stray = EnvelopeCodec::default()
        .wrap(MessageType(u32::MAX), b"\xa0", SecurityFlags::NONE)
        .unwrap();
    assert_eq!(handler.process_bytes(&stray, &origin()), DispatchOutput::default());
}

#[tokio::test]
async fn permissive_without_provider_accepts_signed_envelopes() {
    let _ = tracing_subscriber::fmt::try_init();

    let handler = MessageHandler::new(permissive());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    handler
        .on_request::<GetChunk, _>(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let payload = GetChunkRequest { name: "alpha".into() }.to_bytes().unwrap();
    let signed = EnvelopeCodec::new(Some(loopback()))
        .wrap(
            MessageType(103),
            &payload,
            SecurityFlags {
                signed: true,
                asymmetric_encrypted: false,
            },
        )
        .unwrap();
    handler.process_bytes(&signed, &origin());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_definitions_share_subscribers() {
    let _ = tracing_subscriber::fmt::try_init();

    let definitions = [
        Chunk::OPERATIONS[0],
        Chunk::OPERATIONS[0],
        Chunk::OPERATIONS[1],
    ];
    let context = Arc::new(
        vault_rpc::RpcContext::new(
            &config(vault_rpc::SecurityPolicy::Permissive),
            &definitions,
            None,
        )
        .unwrap(),
    );
    let handler = MessageHandler::new(Arc::clone(&context));
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    handler
        .on_request::<StoreChunk, _>(move |_, _, response| {
            seen.fetch_add(1, Ordering::SeqCst);
            *response = Some(StoreChunkResponse { stored: true });
        })
        .unwrap();

    let payload = StoreChunkRequest {
        name: "alpha".into(),
        data: vec![1],
    }
    .to_bytes()
    .unwrap();
    let second_copy = EnvelopeCodec::default()
        .wrap(MessageType(103), &payload, SecurityFlags::NONE)
        .unwrap();
    let output = handler.process_bytes(&second_copy, &origin());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let reply = context.codec().unwrap(&output.response.unwrap()).unwrap();
    assert_eq!(reply.message_type, MessageType(104));
}
