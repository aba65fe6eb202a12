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

//! Server invoker.
//!
//! A [`ServerInvoker`] owns the service-id → registration map and serves every
//! connection accepted on its bound address. Each request frame is handled in
//! its own task:
//!
//! ```text
//! frame ─► envelope ─► strategy ─► request ─► service ─► overload ─► coerce ─► invoke
//!                                                                              │
//! connection ◄─ envelope ◄─ strategy ◄─ outcome (value or fault) ◄─────────────┘
//! ```
//!
//! An undecodable envelope or an unknown strategy name is a protocol error and
//! closes the connection. Every other failure, including a panic inside the
//! target method, is answered with a [`Fault`] and leaves the connection
//! usable. Responses carry the correlation id of their request and may leave
//! in any order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dsrpc::server::{ServerConfig, ServerInvoker};
//! use dsrpc::service::{arg, MethodDescriptor, ServiceBuilder};
//! use dsrpc::value::{Value, ValueType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = ServerInvoker::new(ServerConfig::default());
//! let echo = ServiceBuilder::new("Echo")
//!     .method_sync(
//!         MethodDescriptor::new("echo", vec![ValueType::String], ValueType::String),
//!         |args| Ok(Value::from(arg::<String>(&args, 0)?)),
//!     )
//!     .build();
//! server.register_instance("echo", echo)?;
//! let address = server.bind(&"tcp://127.0.0.1:0".parse()?).await?;
//! println!("serving on {address}");
//! # Ok(())
//! # }
//! ```

mod config;
pub mod dispatch;

pub use self::config::ServerConfig;

use crate::observability::InvocationMetrics;
use crate::protocol::{Fault, Message, MessageKind, Outcome, Request};
use crate::serialization::{SchemaSource, Strategy, StrategyRegistry};
use crate::service::{
    InterfaceDescriptor, InvokeError, ServiceFactory, ServiceObject, SingletonFactory,
};
use crate::transport::{
    listen, Acceptor, Address, Connection, FrameListener, TransportError, TransportId,
};
use crate::value::ValueType;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct ServiceRegistration {
    factory: Arc<dyn ServiceFactory>,
    interface: Arc<InterfaceDescriptor>,
}

struct ServerShared {
    config: ServerConfig,
    strategies: Arc<StrategyRegistry>,
    services: RwLock<HashMap<String, Arc<ServiceRegistration>>>,
    connections: Mutex<HashMap<TransportId, Arc<Connection>>>,
    metrics: InvocationMetrics,
}

/// Serves registered services over the network.
pub struct ServerInvoker {
    shared: Arc<ServerShared>,
    local_address: Mutex<Option<Address>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ServerInvoker {
    /// Creates a server with the built-in strategies.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_strategies(config, Arc::new(StrategyRegistry::default()))
    }

    /// Creates a server that decodes requests with `strategies`.
    pub fn with_strategies(config: ServerConfig, strategies: Arc<StrategyRegistry>) -> Self {
        Self {
            shared: Arc::new(ServerShared {
                config,
                strategies,
                services: RwLock::new(HashMap::new()),
                connections: Mutex::new(HashMap::new()),
                metrics: InvocationMetrics::new(),
            }),
            local_address: Mutex::new(None),
            accept_task: Mutex::new(None),
        }
    }

    /// Makes `factory`'s service callable under `service_id`.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::AlreadyRegistered`] if the id is taken.
    pub fn register_service(
        &self,
        service_id: impl Into<String>,
        factory: Arc<dyn ServiceFactory>,
    ) -> Result<(), InvokeError> {
        let service_id = service_id.into();
        let mut services = self.shared.services.write();
        if services.contains_key(&service_id) {
            return Err(InvokeError::AlreadyRegistered { service_id });
        }
        let interface = factory.interface();
        info!(%service_id, interface = interface.name(), "service registered");
        services.insert(service_id, Arc::new(ServiceRegistration { factory, interface }));
        Ok(())
    }

    /// Registers a single shared instance.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::AlreadyRegistered`] if the id is taken.
    pub fn register_instance(
        &self,
        service_id: impl Into<String>,
        service: Arc<dyn ServiceObject>,
    ) -> Result<(), InvokeError> {
        self.register_service(service_id, Arc::new(SingletonFactory::new(service)))
    }

    /// Removes a registration. Requests already dispatched complete normally.
    ///
    /// Returns `false` if nothing was registered under `service_id`.
    pub fn unregister_service(&self, service_id: &str) -> bool {
        let removed = self.shared.services.write().remove(service_id).is_some();
        if removed {
            info!(%service_id, "service unregistered");
        }
        removed
    }

    /// Returns `true` if a service is registered under `service_id`.
    pub fn is_registered(&self, service_id: &str) -> bool {
        self.shared.services.read().contains_key(service_id)
    }

    /// Returns the interface registered under `service_id`.
    pub fn interface(&self, service_id: &str) -> Option<Arc<InterfaceDescriptor>> {
        self.shared
            .services
            .read()
            .get(service_id)
            .map(|r| r.interface.clone())
    }

    /// Listens on `address` and serves accepted connections in the background.
    ///
    /// Returns the bound address, with the real port if `0` was requested.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] if the server is
    /// already bound, and the listen error otherwise.
    pub async fn bind(&self, address: &Address) -> Result<Address, TransportError> {
        if self.local_address.lock().is_some() {
            return Err(TransportError::InvalidConfiguration {
                reason: "server is already bound".to_string(),
            });
        }
        let acceptor = listen(address, &self.shared.config.transport).await?;
        let local = acceptor.local_address().clone();
        info!(address = %local, "server listening");

        let mut bound = self.local_address.lock();
        if bound.is_some() {
            return Err(TransportError::InvalidConfiguration {
                reason: "server is already bound".to_string(),
            });
        }
        *bound = Some(local.clone());
        *self.accept_task.lock() = Some(tokio::spawn(accept_loop(self.shared.clone(), acceptor)));
        Ok(local)
    }

    /// The bound address, if [`bind`](Self::bind) succeeded.
    pub fn local_address(&self) -> Option<Address> {
        self.local_address.lock().clone()
    }

    /// Stops accepting and closes every served connection.
    pub fn shutdown(&self) {
        if let Some(task) = self.accept_task.lock().take() {
            task.abort();
        }
        if let Some(address) = self.local_address.lock().take() {
            info!(%address, "server shut down");
        }
        let connections: Vec<_> = self.shared.connections.lock().drain().map(|(_, c)| c).collect();
        for connection in connections {
            connection.close();
        }
    }

    /// Number of connections currently served.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.lock().len()
    }

    /// Server-side counters.
    pub fn metrics(&self) -> &InvocationMetrics {
        &self.shared.metrics
    }

    /// Dispatches `request` in-process, exactly as if it had arrived over a
    /// connection.
    pub async fn dispatch(&self, request: Request) -> Outcome {
        self.shared.dispatch(request).await.0
    }
}

impl Drop for ServerInvoker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ServerInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerInvoker")
            .field("local_address", &self.local_address())
            .field("services", &self.shared.services.read().len())
            .finish()
    }
}

async fn accept_loop(shared: Arc<ServerShared>, acceptor: Acceptor) {
    let handler: Arc<dyn FrameListener> = Arc::new(RequestHandler {
        shared: shared.clone(),
    });
    loop {
        match acceptor.accept(handler.clone()).await {
            Ok(connection) => shared.track(connection),
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(shared.config.accept_backoff).await;
            }
        }
    }
}

impl ServerShared {
    fn track(&self, connection: Arc<Connection>) {
        self.metrics.record_connection_opened();
        let id = connection.id();
        self.connections.lock().insert(id, connection.clone());
        // The reader may have finished before the insert.
        if connection.is_closed() {
            self.connections.lock().remove(&id);
        }
    }

    async fn handle(
        self: Arc<Self>,
        connection: Arc<Connection>,
        message: Message,
        strategy: Arc<dyn Strategy>,
    ) {
        let (outcome, returns) = match strategy.decode_request(&message.body, self.as_ref()) {
            Ok(request) => {
                debug!(
                    correlation_id = message.correlation_id,
                    service_id = %request.service_id,
                    method = %request.method,
                    "request received"
                );
                self.dispatch(request).await
            }
            Err(e) => (Err(Fault::new(Fault::MALFORMED_REQUEST, e.to_string())), None),
        };
        if let Err(fault) = &outcome {
            self.metrics.record_dispatch_fault(&fault.class);
            warn!(correlation_id = message.correlation_id, %fault, "request faulted");
        }

        let body = match strategy.encode_response(&outcome, returns.as_ref()) {
            Ok(body) => body,
            Err(e) => {
                warn!(correlation_id = message.correlation_id, error = %e, "response not encodable");
                let fault: Outcome = Err(Fault::application(format!(
                    "response could not be encoded: {e}"
                )));
                match strategy.encode_response(&fault, None) {
                    Ok(body) => body,
                    Err(e) => {
                        error!(correlation_id = message.correlation_id, error = %e, "fault not encodable");
                        return;
                    }
                }
            }
        };
        let response = Message::response(message.correlation_id, strategy.name(), body);
        let sent = response
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|frame| connection.send(frame).map_err(|e| e.to_string()));
        if let Err(e) = sent {
            warn!(correlation_id = message.correlation_id, error = %e, "response not sent");
        }
    }

    /// Resolves and invokes `request`. Also returns the declared return type
    /// of the resolved method, if resolution got that far.
    async fn dispatch(&self, request: Request) -> (Outcome, Option<ValueType>) {
        let Some(registration) = self.services.read().get(&request.service_id).cloned() else {
            return (Err(Fault::unknown_service(&request.service_id)), None);
        };
        let arg_types = request.arg_types();
        let (index, method) = match dispatch::resolve(&registration.interface, &request.method, &arg_types) {
            Ok(resolved) => resolved,
            Err(fault) => return (Err(fault), None),
        };
        let returns = method.returns().clone();
        let args = match dispatch::coerce_args(method, request.args) {
            Ok(args) => args,
            Err(fault) => return (Err(fault), Some(returns)),
        };
        let service = match registration.factory.get_service() {
            Ok(service) => service,
            Err(fault) => return (Err(fault), Some(returns)),
        };
        self.metrics.record_request_dispatched();

        let target = service.clone();
        let outcome = match tokio::spawn(async move { target.invoke(index, args).await }).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(Fault::new(Fault::PANIC, panic_message(e.into_panic()))),
            Err(e) => Err(Fault::new(Fault::SERVICE_UNAVAILABLE, e.to_string())),
        };
        registration.factory.unget_service(service);

        let outcome = outcome.and_then(|value| {
            let found = value.value_type();
            value.coerce(&returns).map_err(|_| {
                Fault::application(format!(
                    "{}.{} returned {found}, declared {returns}",
                    registration.interface.name(),
                    request.method
                ))
            })
        });
        (outcome, Some(returns))
    }
}

impl SchemaSource for ServerShared {
    fn parameter_types(&self, service_id: &str, method: &str) -> Option<Vec<ValueType>> {
        let services = self.services.read();
        let (_, method) = services.get(service_id)?.interface.unique_method(method)?;
        Some(method.params().to_vec())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "service method panicked".to_string()
    }
}

/// Feeds request frames of served connections into the dispatcher.
struct RequestHandler {
    shared: Arc<ServerShared>,
}

impl FrameListener for RequestHandler {
    fn on_frame(&self, connection: &Arc<Connection>, frame: Vec<u8>) {
        let message = match Message::decode(&frame) {
            Ok(message) if message.kind == MessageKind::Request => message,
            Ok(message) => {
                error!(transport_id = %connection.id(), correlation_id = message.correlation_id, "unexpected response frame, closing");
                connection.close();
                return;
            }
            Err(e) => {
                error!(transport_id = %connection.id(), error = %e, "undecodable envelope, closing");
                connection.close();
                return;
            }
        };
        let Some(strategy) = self.shared.strategies.get(&message.strategy) else {
            error!(transport_id = %connection.id(), strategy = %message.strategy, "unknown strategy, closing");
            connection.close();
            return;
        };
        tokio::spawn(self.shared.clone().handle(connection.clone(), message, strategy));
    }

    fn on_closed(&self, connection: &Arc<Connection>, error: Option<TransportError>) {
        if self.shared.connections.lock().remove(&connection.id()).is_some() {
            self.shared.metrics.record_connection_closed();
        }
        match error {
            Some(e) => warn!(transport_id = %connection.id(), error = %e, "connection lost"),
            None => debug!(transport_id = %connection.id(), "connection closed"),
        }
    }
}
