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

//! Integration tests for overload resolution across the wire, with each
//! built-in serialization strategy.

use dsrpc::client::{ClientConfig, ClientInvoker, Proxy};
use dsrpc::protocol::Fault;
use dsrpc::server::{ServerConfig, ServerInvoker};
use dsrpc::service::{arg, InvokeError, MethodDescriptor, ServiceBuilder, ServiceObject};
use dsrpc::transport::Address;
use dsrpc::value::{Primitive, Value, ValueType};
use std::sync::Arc;

fn boxed_i32() -> ValueType {
    ValueType::Boxed(Primitive::I32)
}

/// `f(int)`, `f(int[])`, `f(Integer)`, `f(Integer[])`, `f(int[][])`,
/// `f(Integer[][])`, each answering with its own signature.
fn overloaded(strategy: &str) -> Arc<dyn ServiceObject> {
    let overloads = [
        ("int", ValueType::I32),
        ("int[]", ValueType::array(ValueType::I32)),
        ("Integer", boxed_i32()),
        ("Integer[]", ValueType::array(boxed_i32())),
        ("int[][]", ValueType::array(ValueType::array(ValueType::I32))),
        ("Integer[][]", ValueType::array(ValueType::array(boxed_i32()))),
    ];
    overloads
        .into_iter()
        .fold(ServiceBuilder::new("com.acme.Overloads").strategy(strategy), |builder, (tag, param)| {
            builder.method_sync(
                MethodDescriptor::new("f", vec![param], ValueType::String),
                move |_| Ok(Value::from(tag)),
            )
        })
        .method_sync(
            MethodDescriptor::new("scale", vec![ValueType::array(ValueType::F64), ValueType::F64], ValueType::array(ValueType::F64))
                .with_strategy("schema"),
            |args| {
                let factor: f64 = arg(&args, 1)?;
                match args.into_iter().next() {
                    Some(Value::Array(element, items)) => Ok(Value::array(
                        element,
                        items
                            .into_iter()
                            .map(|item| f64::try_from(item).map(|x| Value::F64(x * factor)))
                            .collect::<Result<_, _>>()?,
                    )),
                    _ => Err(Fault::new("IllegalArgument", "expected an array")),
                }
            },
        )
        .build()
}

async fn proxy_for(service: Arc<dyn ServiceObject>) -> (ServerInvoker, ClientInvoker, Proxy) {
    let interface = service.interface();
    let server = ServerInvoker::new(ServerConfig::default());
    server.register_instance("overloads", service).unwrap();
    let address = server
        .bind(&Address::tcp("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap();
    let client = ClientInvoker::new(ClientConfig::default());
    let proxy = client.proxy(address, "overloads", interface);
    (server, client, proxy)
}

/// One argument of each overload's exact type, with the expected answer.
fn calls() -> Vec<(Value, &'static str)> {
    let boxed = |v: i32| Value::boxed(Value::I32(v));
    vec![
        (Value::I32(1), "int"),
        (Value::from(vec![1i32, 2]), "int[]"),
        (boxed(1), "Integer"),
        (Value::array(boxed_i32(), vec![boxed(1), boxed(2)]), "Integer[]"),
        (
            Value::array(ValueType::array(ValueType::I32), vec![Value::from(vec![1i32])]),
            "int[][]",
        ),
        (
            Value::array(
                ValueType::array(boxed_i32()),
                vec![Value::array(boxed_i32(), vec![boxed(3)])],
            ),
            "Integer[][]",
        ),
    ]
}

async fn assert_dispatch(strategy: &str) {
    let (_server, _client, proxy) = proxy_for(overloaded(strategy)).await;
    for (argument, expected) in calls() {
        let answer = proxy.call("f", vec![argument.clone()]).await.unwrap();
        assert_eq!(answer, Value::from(expected), "{strategy}: argument {argument:?}");
    }
}

#[tokio::test]
async fn test_overloads_with_default_strategy() {
    assert_dispatch("default").await;
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_overloads_with_json_strategy() {
    assert_dispatch("json").await;
}

#[tokio::test]
async fn test_widening_and_missing_overloads() {
    let (_server, _client, proxy) = proxy_for(overloaded("default")).await;

    // i16 widens to int; nothing is closer.
    assert_eq!(proxy.call("f", vec![Value::I16(4)]).await.unwrap(), Value::from("int"));

    let error = proxy.call("f", vec![Value::from("text")]).await.unwrap_err();
    let fault = error.fault().unwrap();
    assert!(fault.is(Fault::NO_SUCH_METHOD), "unexpected fault {fault:?}");
    assert_eq!(fault.message, "com.acme.Overloads.f(string)");

    let error = proxy.call("f", vec![Value::I32(1), Value::I32(2)]).await.unwrap_err();
    assert!(error.fault().unwrap().is(Fault::NO_SUCH_METHOD));
}

#[tokio::test]
async fn test_schema_strategy_uses_declared_signature() {
    let (_server, _client, proxy) = proxy_for(overloaded("default")).await;
    let scaled = proxy
        .call("scale", vec![Value::from(vec![1.0f64, 2.5]), Value::F64(2.0)])
        .await
        .unwrap();
    assert_eq!(scaled, Value::from(vec![2.0f64, 5.0]));
}

#[tokio::test]
async fn test_schema_strategy_rejects_overloaded_names() {
    let (_server, client, proxy) = proxy_for(overloaded("schema")).await;
    let error = proxy.call("f", vec![Value::I32(1)]).await.unwrap_err();
    assert!(matches!(error, InvokeError::Serialization(_)), "unexpected error {error}");
    // Nothing was sent.
    assert_eq!(client.connection_count(), 0);
}
