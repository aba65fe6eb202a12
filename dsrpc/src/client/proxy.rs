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

//! Local call handles for remote services.

use crate::client::pending::{Completion, PendingInvocation};
use crate::client::ClientShared;
use crate::protocol::{Message, Request};
use crate::server::dispatch;
use crate::service::{InterfaceDescriptor, InvokeError, MethodDescriptor};
use crate::transport::{Address, TransportError};
use crate::value::{Value, ValueType};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

/// Extra wait granted to blocking callers beyond the call and connect
/// deadlines before they give up on their own.
const BLOCKING_GRACE: Duration = Duration::from_secs(1);

/// Calls methods of one remote service.
///
/// Cloning is cheap; clones share the invoker and its connections. Calls are
/// made by method name with dynamically typed arguments; the remote side
/// resolves overloads from the argument types.
#[derive(Clone)]
pub struct Proxy {
    shared: Arc<ClientShared>,
    address: Address,
    service_id: String,
    interface: Arc<InterfaceDescriptor>,
}

impl Proxy {
    pub(crate) fn new(
        shared: Arc<ClientShared>,
        address: Address,
        service_id: String,
        interface: Arc<InterfaceDescriptor>,
    ) -> Self {
        Self {
            shared,
            address,
            service_id,
            interface,
        }
    }

    /// Address of the remote server.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Id of the remote service.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Interface of the remote service.
    pub fn interface(&self) -> &Arc<InterfaceDescriptor> {
        &self.interface
    }

    /// Calls `method` with the default deadline.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Fault`] for remote faults, and the connection,
    /// encoding and timeout errors described on [`InvokeError`].
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, InvokeError> {
        self.call_timeout(method, args, self.shared.config.call_timeout)
            .await
    }

    /// Calls `method` with an explicit deadline.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_timeout(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let (tx, rx) = oneshot::channel();
        self.start(
            method,
            args,
            timeout,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;
        rx.await.unwrap_or(Err(InvokeError::ConnectionClosed))
    }

    /// Calls `method` and blocks the current thread until it completes.
    ///
    /// Must not be called from an async task: the call itself runs on the
    /// invoker's runtime.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub fn call_blocking(&self, method: &str, args: Vec<Value>) -> Result<Value, InvokeError> {
        self.call_blocking_timeout(method, args, self.shared.config.call_timeout)
    }

    /// Blocking call with an explicit deadline.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub fn call_blocking_timeout(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let (tx, rx) = mpsc::channel();
        self.spawn_call(
            method,
            args,
            timeout,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        let patience = timeout + self.shared.config.transport.connect_timeout + BLOCKING_GRACE;
        match rx.recv_timeout(patience) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(InvokeError::Timeout { duration: timeout }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(InvokeError::ConnectionClosed),
        }
    }

    /// Starts a call and returns at once; `callback` receives the result.
    ///
    /// The callback runs on the invoker's runtime and may start new calls.
    pub fn call_with_callback<F>(&self, method: &str, args: Vec<Value>, callback: F)
    where
        F: FnOnce(Result<Value, InvokeError>) + Send + 'static,
    {
        self.spawn_call(method, args, self.shared.config.call_timeout, Box::new(callback));
    }

    fn spawn_call(&self, method: &str, args: Vec<Value>, timeout: Duration, completion: Completion) {
        let proxy = self.clone();
        let method = method.to_string();
        self.shared.runtime.spawn(async move {
            proxy.start(&method, args, timeout, completion).await;
        });
    }

    /// Sends the request and registers `completion`. Every path ends in
    /// exactly one invocation of `completion`.
    async fn start(&self, method: &str, args: Vec<Value>, timeout: Duration, completion: Completion) {
        let metrics = self.shared.metrics.clone();
        let started = Instant::now();
        metrics.record_call_started();
        let completion: Completion = Box::new(move |result| {
            match &result {
                Ok(_) => metrics.record_call_succeeded(started.elapsed()),
                Err(e) => metrics.record_call_failed(e),
            }
            completion(result);
        });

        let arg_types: Vec<ValueType> = args.iter().map(Value::value_type).collect();
        let resolved = dispatch::resolve(&self.interface, method, &arg_types)
            .ok()
            .map(|(_, m)| m);
        let strategy_name = self.interface.strategy_for(resolved);
        let Some(strategy) = self.shared.strategies.get(strategy_name) else {
            return completion(Err(InvokeError::UnknownStrategy {
                name: strategy_name.to_string(),
            }));
        };
        // Untagged strategies need a signature; overloaded names have none.
        let params = resolved
            .filter(|_| self.interface.unique_method(method).is_some())
            .map(MethodDescriptor::params);
        let returns = resolved.map(|m| m.returns().clone());

        let request = Request::new(self.service_id.clone(), method, args);
        let body = match strategy.encode_request(&request, params) {
            Ok(body) => body,
            Err(e) => return completion(Err(e.into())),
        };
        let client = match self.shared.connection(&self.address).await {
            Ok(client) => client,
            Err(e) => return completion(Err(e.into())),
        };
        let id = client.pending.next_id();
        let frame = match Message::request(id, strategy.name(), body).encode() {
            Ok(frame) => frame,
            Err(e) => return completion(Err(e.into())),
        };
        if !client
            .pending
            .insert(id, PendingInvocation::new(completion, strategy, returns, timeout))
        {
            return;
        }
        debug!(
            correlation_id = id,
            address = %self.address,
            service_id = %self.service_id,
            method,
            "request sent"
        );
        if let Err(e) = client.connection.send(frame) {
            let error = match e {
                TransportError::Closed => InvokeError::ConnectionClosed,
                e => InvokeError::Transport(e),
            };
            client.pending.fail(id, error);
        }
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("address", &self.address)
            .field("service_id", &self.service_id)
            .field("interface", &self.interface.name())
            .finish()
    }
}
