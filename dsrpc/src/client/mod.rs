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

//! Client invoker.
//!
//! A [`ClientInvoker`] hands out [`Proxy`] handles for remote services. All
//! proxies for one address share a single connection, opened on first use and
//! reopened by the next call after it fails. Each connection has its own
//! [`PendingInvocations`] table that routes responses back to their callers
//! by correlation id, so any number of calls may be in flight at once and
//! answered in any order.
//!
//! Three calling conventions are offered:
//!
//! | Method | Waits by |
//! |---|---|
//! | [`Proxy::call`] | awaiting a future |
//! | [`Proxy::call_blocking`] | blocking the calling thread |
//! | [`Proxy::call_with_callback`] | invoking a callback |
//!
//! # Examples
//!
//! ```rust,no_run
//! use dsrpc::client::{ClientConfig, ClientInvoker};
//! use dsrpc::service::{InterfaceDescriptor, MethodDescriptor};
//! use dsrpc::value::{Value, ValueType};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientInvoker::new(ClientConfig::default());
//! let interface = Arc::new(InterfaceDescriptor::new("Calculator").with_method(
//!     MethodDescriptor::new("add", vec![ValueType::I32, ValueType::I32], ValueType::I32),
//! ));
//! let calculator = client.proxy("tcp://127.0.0.1:9000".parse()?, "calc", interface);
//! let sum = calculator.call("add", vec![Value::I32(2), Value::I32(3)]).await?;
//! assert_eq!(sum, Value::I32(5));
//! # Ok(())
//! # }
//! ```

mod config;
mod pending;
mod proxy;

pub use self::config::ClientConfig;
pub use self::pending::{Completion, CorrelationIdGenerator, PendingInvocation, PendingInvocations};
pub use self::proxy::Proxy;

use crate::observability::InvocationMetrics;
use crate::protocol::{Message, MessageKind};
use crate::serialization::StrategyRegistry;
use crate::service::InterfaceDescriptor;
use crate::transport::{connect, Address, Connection, FrameListener, TransportError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

type ConnectionSlot = Arc<tokio::sync::Mutex<Option<Arc<ClientConnection>>>>;

/// A connection together with the calls waiting on it.
struct ClientConnection {
    connection: Arc<Connection>,
    pending: Arc<PendingInvocations>,
}

pub(crate) struct ClientShared {
    config: ClientConfig,
    strategies: Arc<StrategyRegistry>,
    connections: Mutex<HashMap<Address, ConnectionSlot>>,
    metrics: Arc<InvocationMetrics>,
    runtime: Handle,
}

impl ClientShared {
    /// Returns the open connection for `address`, connecting if there is none
    /// or the previous one failed. Concurrent callers for one address wait for
    /// a single connect attempt.
    async fn connection(&self, address: &Address) -> Result<Arc<ClientConnection>, TransportError> {
        let slot = self
            .connections
            .lock()
            .entry(address.clone())
            .or_default()
            .clone();
        let mut slot = slot.lock().await;
        if let Some(existing) = slot.as_ref() {
            if !existing.connection.is_closed() {
                return Ok(existing.clone());
            }
            debug!(%address, "replacing closed connection");
        }

        let pending = Arc::new(PendingInvocations::new(self.runtime.clone()));
        let router = Arc::new(ResponseRouter {
            pending: pending.clone(),
            metrics: self.metrics.clone(),
        });
        let connection = connect(address, &self.config.transport, router).await?;
        self.metrics.record_connection_opened();
        info!(%address, transport_id = %connection.id(), "connected");

        let client = Arc::new(ClientConnection {
            connection,
            pending,
        });
        *slot = Some(client.clone());
        Ok(client)
    }

    fn close_all(&self) {
        let slots: Vec<_> = self.connections.lock().drain().map(|(_, slot)| slot).collect();
        for slot in slots {
            match slot.try_lock() {
                Ok(mut slot) => {
                    if let Some(client) = slot.take() {
                        client.connection.close();
                    }
                }
                // A connect is in flight; it owns the slot and drops it unused.
                Err(_) => debug!("skipping connection slot in use"),
            }
        }
    }
}

impl Drop for ClientShared {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Routes response frames to the pending calls of one connection.
struct ResponseRouter {
    pending: Arc<PendingInvocations>,
    metrics: Arc<InvocationMetrics>,
}

impl FrameListener for ResponseRouter {
    fn on_frame(&self, connection: &Arc<Connection>, frame: Vec<u8>) {
        match Message::decode(&frame) {
            Ok(message) if message.kind == MessageKind::Response => {
                self.pending.complete(message.correlation_id, &message.body);
            }
            Ok(message) => {
                error!(transport_id = %connection.id(), correlation_id = message.correlation_id, "unexpected request frame, closing");
                connection.close();
            }
            Err(e) => {
                error!(transport_id = %connection.id(), error = %e, "undecodable envelope, closing");
                connection.close();
            }
        }
    }

    fn on_closed(&self, connection: &Arc<Connection>, error: Option<TransportError>) {
        self.metrics.record_connection_closed();
        let failed = self.pending.fail_all();
        match error {
            Some(e) => warn!(transport_id = %connection.id(), error = %e, failed, "connection lost"),
            None => debug!(transport_id = %connection.id(), failed, "connection closed"),
        }
    }
}

/// Issues calls to remote services.
pub struct ClientInvoker {
    shared: Arc<ClientShared>,
}

impl ClientInvoker {
    /// Creates an invoker with the built-in strategies.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime; use
    /// [`with_runtime`](Self::with_runtime) to pass one explicitly.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_runtime(config, Arc::new(StrategyRegistry::default()), Handle::current())
    }

    /// Creates an invoker that encodes with `strategies` and runs its
    /// connections, timers and callbacks on `runtime`.
    pub fn with_runtime(
        config: ClientConfig,
        strategies: Arc<StrategyRegistry>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(ClientShared {
                config,
                strategies,
                connections: Mutex::new(HashMap::new()),
                metrics: Arc::new(InvocationMetrics::new()),
                runtime,
            }),
        }
    }

    /// Returns a proxy for `service_id` at `address`. No connection is made
    /// until the first call.
    pub fn proxy(
        &self,
        address: Address,
        service_id: impl Into<String>,
        interface: Arc<InterfaceDescriptor>,
    ) -> Proxy {
        Proxy::new(self.shared.clone(), address, service_id.into(), interface)
    }

    /// Closes every connection; their pending calls fail with
    /// [`InvokeError::ConnectionClosed`](crate::service::InvokeError::ConnectionClosed).
    /// Later calls reconnect.
    pub fn close_all(&self) {
        self.shared.close_all();
    }

    /// Number of addresses with an open connection.
    pub fn connection_count(&self) -> usize {
        let slots: Vec<_> = self.shared.connections.lock().values().cloned().collect();
        slots
            .iter()
            .filter(|slot| {
                slot.try_lock()
                    .map(|slot| slot.as_ref().is_some_and(|c| !c.connection.is_closed()))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Client-side counters.
    pub fn metrics(&self) -> &InvocationMetrics {
        &self.shared.metrics
    }
}

impl std::fmt::Debug for ClientInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientInvoker")
            .field("call_timeout", &self.shared.config.call_timeout)
            .field("addresses", &self.shared.connections.lock().len())
            .finish()
    }
}
