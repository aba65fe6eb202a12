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

//! Transport layer.
//!
//! The transport layer moves frames between processes:
//!
//! - [`Address`]: `scheme://host:port`; `tcp` is the built-in scheme
//! - [`Transport`] / [`TcpTransport`]: raw byte streams
//! - [`Connection`]: a framed stream with an ordered outbound queue that
//!   delivers inbound frames to a [`FrameListener`]
//! - [`connect`] / [`listen`] / [`Acceptor`]: open connections by address
//!
//! # Architecture
//!
//! ```text
//!   send(bytes) ──► outbound queue ──► writer task ──► socket
//!                                                        │
//!   FrameListener ◄── reader task ◄── WireCodec ◄────────┘
//! ```
//!
//! Each connection is served by its own pair of tasks, so a slow or broken
//! peer never stalls another connection.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dsrpc::transport::{connect, Connection, FrameListener, TransportConfig, TransportError};
//! use std::sync::Arc;
//!
//! struct Print;
//!
//! impl FrameListener for Print {
//!     fn on_frame(&self, _connection: &Arc<Connection>, frame: Vec<u8>) {
//!         println!("received {} bytes", frame.len());
//!     }
//!     fn on_closed(&self, _connection: &Arc<Connection>, error: Option<TransportError>) {
//!         println!("closed: {:?}", error);
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let address = "tcp://127.0.0.1:9000".parse()?;
//! let connection = connect(&address, &TransportConfig::default(), Arc::new(Print)).await?;
//! connection.send(b"hello".to_vec())?;
//! connection.close();
//! # Ok(())
//! # }
//! ```

mod acceptor;
mod address;
mod config;
mod connection;
mod error;
mod tcp;
mod traits;
mod types;

pub use self::acceptor::{connect, listen, Acceptor};
pub use self::address::{Address, TCP_SCHEME};
pub use self::config::TransportConfig;
pub use self::connection::Connection;
pub use self::error::TransportError;
pub use self::tcp::TcpTransport;
pub use self::traits::{FrameListener, Transport};
pub use self::types::{TransportId, TransportMetadata};
