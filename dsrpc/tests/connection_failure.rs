//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for failure isolation: corrupt frames, faults, panics
//! and shutdown affect only the connection or call they belong to.

use dsrpc::client::{ClientConfig, ClientInvoker, Proxy};
use dsrpc::protocol::{Fault, Message, Outcome, Request};
use dsrpc::serialization::{
    LengthPrefixedCodec, PostcardSerializer, PostcardStrategy, Serializer, Strategy, WireCodec,
    DEFAULT_STRATEGY,
};
use dsrpc::server::{ServerConfig, ServerInvoker};
use dsrpc::service::{arg, InterfaceDescriptor, InvokeError, MethodDescriptor, ServiceBuilder, ServiceObject};
use dsrpc::transport::Address;
use dsrpc::value::{Value, ValueType};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

fn fragile_service() -> Arc<dyn ServiceObject> {
    ServiceBuilder::new("com.acme.Fragile")
        .method_sync(
            MethodDescriptor::new("add", vec![ValueType::I64, ValueType::I64], ValueType::I64),
            |args| Ok(Value::I64(arg::<i64>(&args, 0)? + arg::<i64>(&args, 1)?)),
        )
        .method_sync(MethodDescriptor::new("fail", vec![], ValueType::Null), |_| {
            Err(Fault::application("refused"))
        })
        .method_sync(MethodDescriptor::new("explode", vec![], ValueType::Null), |_| {
            panic!("service blew up")
        })
        .method(
            MethodDescriptor::new("stall", vec![], ValueType::Null),
            |_| async move {
                sleep(Duration::from_secs(5)).await;
                Ok::<_, Fault>(Value::Null)
            },
        )
        .build()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

async fn start() -> (ServerInvoker, ClientInvoker, Proxy) {
    init_tracing();
    let service = fragile_service();
    let interface = service.interface();
    let server = ServerInvoker::new(ServerConfig::default());
    server.register_instance("fragile", service).unwrap();
    let address = server
        .bind(&Address::tcp("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap();
    let client = ClientInvoker::new(ClientConfig::default());
    let proxy = client.proxy(address, "fragile", interface);
    (server, client, proxy)
}

/// Postcard bytes of `Value::List` wrapped `levels` times around the tail of
/// `encoded`, whose final byte must be an encoded `Value::Null`.
fn deeply_nested(encoded: Vec<u8>, levels: usize) -> Vec<u8> {
    let postcard = PostcardSerializer::default();
    let mut wrapper = postcard.serialize(&Value::List(vec![Value::Null])).unwrap();
    let null = wrapper.pop().unwrap();
    let mut bytes = encoded;
    assert_eq!(bytes.pop(), Some(null));
    for _ in 0..levels {
        bytes.extend_from_slice(&wrapper);
    }
    bytes.push(null);
    bytes
}

async fn write_frame(socket: &mut TcpStream, message: &Message) {
    let mut frame = Vec::new();
    LengthPrefixedCodec::default()
        .encode(&message.encode().unwrap(), &mut frame)
        .unwrap();
    socket.write_all(&frame).await.unwrap();
}

async fn read_frame(socket: &mut TcpStream) -> Message {
    let codec = LengthPrefixedCodec::default();
    let mut buffer = Vec::new();
    loop {
        if let Some(frame) = codec.decode(&mut buffer).unwrap() {
            return Message::decode(&frame).unwrap();
        }
        let mut chunk = [0u8; 4096];
        let read = socket.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before a frame arrived");
        buffer.extend_from_slice(&chunk[..read]);
    }
}

fn add(a: i64, b: i64) -> Vec<Value> {
    vec![Value::I64(a), Value::I64(b)]
}

#[tokio::test]
async fn test_oversized_frame_closes_only_that_connection() {
    let (server, _client, proxy) = start().await;
    assert_eq!(proxy.call("add", add(1, 2)).await.unwrap(), Value::I64(3));

    let mut rogue = TcpStream::connect(proxy.address().authority()).await.unwrap();
    rogue.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();
    let mut buf = [0u8; 16];
    let read = timeout(Duration::from_secs(5), rogue.read(&mut buf))
        .await
        .expect("server did not close the rogue connection");
    assert!(matches!(read, Ok(0) | Err(_)));

    // The well-behaved connection is untouched and the server still accepts.
    assert_eq!(proxy.call("add", add(2, 2)).await.unwrap(), Value::I64(4));
    let fresh = ClientInvoker::new(ClientConfig::default());
    let other = fresh.proxy(proxy.address().clone(), "fragile", proxy.interface().clone());
    assert_eq!(other.call("add", add(3, 3)).await.unwrap(), Value::I64(6));

    let settled = timeout(Duration::from_secs(5), async {
        while server.connection_count() != 2 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(settled.is_ok(), "served connections: {}", server.connection_count());
}

#[tokio::test]
async fn test_oversized_response_fails_pending_calls() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = Address::tcp(listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        socket.read_exact(&mut buf).await.unwrap();
        socket.write_all(&[0xFF, 0xFF, 0xFF, 0xF0]).await.unwrap();
        sleep(Duration::from_secs(1)).await;
    });

    let client = ClientInvoker::new(ClientConfig::default());
    let proxy = client.proxy(address, "anything", Arc::new(InterfaceDescriptor::new("Any")));
    let error = timeout(Duration::from_secs(5), proxy.call("ping", vec![]))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(error, InvokeError::ConnectionClosed), "unexpected error {error}");
    assert_eq!(client.metrics().snapshot().calls_connection_lost, 1);
}

#[tokio::test]
async fn test_faults_and_panics_keep_connection_usable() {
    let (server, client, proxy) = start().await;

    let error = proxy.call("fail", vec![]).await.unwrap_err();
    assert_eq!(error.fault(), Some(&Fault::application("refused")));

    let error = proxy.call("explode", vec![]).await.unwrap_err();
    let fault = error.fault().unwrap();
    assert!(fault.is(Fault::PANIC));
    assert_eq!(fault.message, "service blew up");

    assert_eq!(proxy.call("add", add(20, 22)).await.unwrap(), Value::I64(42));
    assert_eq!(client.connection_count(), 1);
    assert_eq!(server.connection_count(), 1);

    let snapshot = client.metrics().snapshot();
    assert_eq!(snapshot.calls_faulted, 2);
    assert_eq!(snapshot.calls_succeeded, 1);
    assert_eq!(server.metrics().snapshot().dispatch_faults, 2);
}

#[tokio::test]
async fn test_shutdown_fails_in_flight_calls() {
    let (server, client, proxy) = start().await;
    let stalled = {
        let proxy = proxy.clone();
        tokio::spawn(async move { proxy.call("stall", vec![]).await })
    };
    sleep(Duration::from_millis(100)).await;
    server.shutdown();

    let result = timeout(Duration::from_secs(5), stalled).await.unwrap().unwrap();
    assert!(matches!(result, Err(InvokeError::ConnectionClosed)));
    assert_eq!(client.connection_count(), 0);

    let error = proxy.call("add", add(1, 1)).await.unwrap_err();
    assert!(matches!(error, InvokeError::Transport(_)), "unexpected error {error}");
    assert!(error.is_recoverable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_deadline_never_hangs() {
    let (_server, client, proxy) = start().await;
    let calls: Vec<_> = (0..200)
        .map(|_| {
            let proxy = proxy.clone();
            tokio::spawn(async move {
                timeout(Duration::from_secs(2), proxy.call_timeout("stall", vec![], Duration::ZERO)).await
            })
        })
        .collect();
    for call in calls {
        let result = call.await.unwrap();
        assert!(
            matches!(result, Ok(Err(InvokeError::Timeout { .. }))),
            "call did not time out: {result:?}"
        );
    }
    assert_eq!(client.metrics().snapshot().calls_timed_out, 200);
}

#[tokio::test]
async fn test_deeply_nested_request_is_malformed() {
    let (server, _client, proxy) = start().await;
    let strategy = PostcardStrategy::default();
    let request = Request::new("fragile", "add", vec![Value::Null]);
    let body = deeply_nested(strategy.encode_request(&request, None).unwrap(), 100_000);

    let mut rogue = TcpStream::connect(proxy.address().authority()).await.unwrap();
    write_frame(&mut rogue, &Message::request(7, DEFAULT_STRATEGY, body)).await;
    let reply = timeout(Duration::from_secs(5), read_frame(&mut rogue))
        .await
        .expect("server did not answer the nested request");
    assert_eq!(reply.correlation_id, 7);
    let fault = strategy.decode_response(&reply.body, None).unwrap().unwrap_err();
    assert!(fault.is(Fault::MALFORMED_REQUEST), "unexpected fault {fault}");

    // Both the rogue connection and the server stay usable.
    write_frame(&mut rogue, &Message::request(8, DEFAULT_STRATEGY, strategy.encode_request(&request, None).unwrap())).await;
    let reply = timeout(Duration::from_secs(5), read_frame(&mut rogue)).await.unwrap();
    assert_eq!(reply.correlation_id, 8);
    assert_eq!(proxy.call("add", add(4, 5)).await.unwrap(), Value::I64(9));
    assert_eq!(server.connection_count(), 2);
}

#[tokio::test]
async fn test_deeply_nested_response_fails_the_call() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = Address::tcp(listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_frame(&mut socket).await;
        let outcome: Outcome = Ok(Value::Null);
        let body = deeply_nested(PostcardStrategy::default().encode_response(&outcome, None).unwrap(), 100_000);
        write_frame(&mut socket, &Message::response(request.correlation_id, DEFAULT_STRATEGY, body)).await;
        sleep(Duration::from_secs(1)).await;
    });

    let client = ClientInvoker::new(ClientConfig::default());
    let proxy = client.proxy(address, "anything", Arc::new(InterfaceDescriptor::new("Any")));
    let error = timeout(Duration::from_secs(5), proxy.call("ping", vec![]))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(error, InvokeError::Deserialization(_)), "unexpected error {error}");
}
