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

#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # DSRPC - Distributed Service Invocation Runtime
//!
//! DSRPC lets a process call methods on service objects that live in another
//! process, and decides which remote services a process should use:
//!
//! - **Remote invocation by name**: calls carry a method name and dynamically
//!   typed arguments; the server picks the most specific overload
//! - **Pluggable serialization**: postcard (`"default"`), JSON (`"json"`) and
//!   a signature-driven untagged encoding (`"schema"`), chosen per method
//! - **Async, blocking and callback calls** with per-call deadlines
//! - **LDAP-style filters** over endpoint attributes, backed by an indexed
//!   capability set
//! - **Reference-counted imports** of remote endpoints driven by discovery
//!   events and local interests
//!
//! ## Architecture
//!
//! - **[`transport`]**: TCP connections carrying length-prefixed frames
//! - **[`serialization`]**: wire codec and serialization strategies
//! - **[`protocol`]**: the message envelope, requests and faults
//! - **[`value`]**: dynamically typed values and their types
//! - **[`service`]**: interface descriptors and service objects
//! - **[`server`]**: the server invoker and overload resolution
//! - **[`client`]**: the client invoker and proxies
//! - **[`filter`]**, **[`properties`]**, **[`capability`]**: attribute bags
//!   and the filters that query them
//! - **[`endpoint`]**: endpoint descriptions, discovery and the registry
//! - **[`observability`]**: invocation metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use dsrpc::client::{ClientConfig, ClientInvoker};
//! use dsrpc::server::{ServerConfig, ServerInvoker};
//! use dsrpc::service::{arg, MethodDescriptor, ServiceBuilder, ServiceObject};
//! use dsrpc::transport::Address;
//! use dsrpc::value::{Value, ValueType};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), dsrpc::DsrpcError> {
//! let i64_ty = ValueType::I64;
//! let calculator = ServiceBuilder::new("com.acme.Calculator")
//!     .method_sync(
//!         MethodDescriptor::new("add", vec![i64_ty.clone(), i64_ty.clone()], i64_ty.clone()),
//!         |args| {
//!             let (a, b): (i64, i64) = (arg(&args, 0)?, arg(&args, 1)?);
//!             Ok(Value::from(a + b))
//!         },
//!     )
//!     .build();
//! let interface = calculator.interface();
//!
//! let server = ServerInvoker::new(ServerConfig::default());
//! server.register_instance("calc", calculator)?;
//! let address = server.bind(&"tcp://127.0.0.1:0".parse::<Address>()?).await?;
//!
//! let client = ClientInvoker::new(ClientConfig::default());
//! let proxy = client.proxy(address, "calc", interface);
//! // i32 arguments widen to the declared i64 parameters.
//! let sum = proxy.call("add", vec![Value::from(2i32), Value::from(3i32)]).await?;
//! assert_eq!(sum, Value::I64(5));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`json`** (default): the `"json"` serialization strategy
//! - **`observability`**: export invocation counters through the `metrics`
//!   crate in addition to the built-in atomic counters
//!
//! ## Error Handling
//!
//! Every layer has its own error type ([`TransportError`],
//! [`SerializationError`](serialization::SerializationError),
//! [`InvokeError`], [`FilterError`], [`EndpointError`]); [`DsrpcError`]
//! composes them. Remote faults arrive as [`InvokeError::Fault`].
//!
//! ## Safety
//!
//! DSRPC is written in 100% safe Rust with `#![deny(unsafe_code)]`.

pub mod capability;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod observability;
pub mod properties;
pub mod protocol;
pub mod serialization;
pub mod server;
pub mod service;
pub mod transport;
pub mod value;

pub use client::{ClientConfig, ClientInvoker, Proxy};
pub use endpoint::{EndpointDescription, EndpointError, EndpointRegistry};
pub use error::DsrpcError;
pub use filter::{Filter, FilterError};
pub use observability::InvocationMetrics;
pub use protocol::Fault;
pub use server::{ServerConfig, ServerInvoker};
pub use service::{InterfaceDescriptor, InvokeError, MethodDescriptor, ServiceObject};
pub use transport::{Address, TransportError};
pub use value::{Value, ValueType};
