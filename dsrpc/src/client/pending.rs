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

//! Tracking of calls awaiting responses.
//!
//! Each client connection keeps one [`PendingInvocations`] table. An entry is
//! fulfilled exactly once, by whichever comes first:
//!
//! - a response with its correlation id ([`PendingInvocations::complete`]),
//! - its deadline (a timer task armed by [`PendingInvocations::insert`]),
//! - the connection closing ([`PendingInvocations::fail_all`]).
//!
//! Fulfilling removes the entry under the table lock and runs the completion
//! after the lock is released, so a completion may start new calls.

use crate::serialization::Strategy;
use crate::service::InvokeError;
use crate::value::{Value, ValueType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::debug;

/// Receives the result of one call.
pub type Completion = Box<dyn FnOnce(Result<Value, InvokeError>) + Send>;

/// Generates correlation ids.
///
/// Ids start at 1 and increase monotonically; 0 is reserved.
///
/// # Example
///
/// ```rust
/// use dsrpc::client::CorrelationIdGenerator;
///
/// let generator = CorrelationIdGenerator::new();
/// assert_eq!(generator.next(), 1);
/// assert_eq!(generator.next(), 2);
/// ```
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    next_id: AtomicU64,
}

impl CorrelationIdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the next id.
    #[must_use]
    pub fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the id the next call to [`next`](Self::next) will produce.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// What a pending entry needs to decode and deliver its response.
pub struct PendingInvocation {
    completion: Completion,
    strategy: Arc<dyn Strategy>,
    returns: Option<ValueType>,
    timeout: Duration,
    timer: Option<AbortHandle>,
}

impl PendingInvocation {
    /// Creates an entry whose response is decoded with `strategy` and coerced
    /// to `returns` when known.
    pub fn new(
        completion: Completion,
        strategy: Arc<dyn Strategy>,
        returns: Option<ValueType>,
        timeout: Duration,
    ) -> Self {
        Self {
            completion,
            strategy,
            returns,
            timeout,
            timer: None,
        }
    }

    fn finish(self, result: Result<Value, InvokeError>) {
        if let Some(timer) = &self.timer {
            timer.abort();
        }
        (self.completion)(result);
    }
}

#[derive(Default)]
struct PendingState {
    entries: HashMap<u64, PendingInvocation>,
    closed: bool,
}

/// Calls awaiting responses on one connection.
pub struct PendingInvocations {
    ids: CorrelationIdGenerator,
    state: Mutex<PendingState>,
    runtime: Handle,
}

impl PendingInvocations {
    /// Creates an empty table whose deadline timers run on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            ids: CorrelationIdGenerator::new(),
            state: Mutex::new(PendingState::default()),
            runtime,
        }
    }

    /// Reserves a correlation id.
    pub fn next_id(&self) -> u64 {
        self.ids.next()
    }

    /// Adds an entry under `id` and arms its deadline.
    ///
    /// If the table was already failed by [`fail_all`](Self::fail_all) the
    /// entry is completed with [`InvokeError::ConnectionClosed`] at once and
    /// `false` is returned.
    pub fn insert(self: &Arc<Self>, id: u64, invocation: PendingInvocation) -> bool {
        let timeout = invocation.timeout;
        {
            let mut state = self.state.lock();
            if state.closed {
                drop(state);
                invocation.finish(Err(InvokeError::ConnectionClosed));
                return false;
            }
            state.entries.insert(id, invocation);
        }

        // Armed only once the entry is visible to `expire`.
        let table = Arc::downgrade(self);
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(&table, id);
        });
        match self.state.lock().entries.get_mut(&id) {
            Some(entry) => entry.timer = Some(timer.abort_handle()),
            None => timer.abort(),
        }
        true
    }

    /// Delivers the response body for `id`.
    ///
    /// Returns `false` if no call is waiting for it, e.g. because it already
    /// timed out; such responses are dropped.
    pub fn complete(&self, id: u64, body: &[u8]) -> bool {
        let Some(invocation) = self.take(id) else {
            debug!(correlation_id = id, "discarding response without pending call");
            return false;
        };
        let result = match invocation.strategy.decode_response(body, invocation.returns.as_ref()) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(fault)) => Err(InvokeError::Fault(fault)),
            Err(e) => Err(InvokeError::Deserialization(e)),
        };
        invocation.finish(result);
        true
    }

    /// Completes the call `id` with `error`, if it is still pending.
    pub fn fail(&self, id: u64, error: InvokeError) -> bool {
        match self.take(id) {
            Some(invocation) => {
                invocation.finish(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fails every pending call with [`InvokeError::ConnectionClosed`] and
    /// rejects later inserts.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.entries.drain().map(|(_, invocation)| invocation).collect()
        };
        let count = drained.len();
        for invocation in drained {
            invocation.finish(Err(InvokeError::ConnectionClosed));
        }
        count
    }

    /// Number of calls waiting.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if no call is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`fail_all`](Self::fail_all) ran.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn take(&self, id: u64) -> Option<PendingInvocation> {
        self.state.lock().entries.remove(&id)
    }
}

fn expire(table: &Weak<PendingInvocations>, id: u64) {
    let Some(table) = table.upgrade() else {
        return;
    };
    let Some(mut invocation) = table.take(id) else {
        return;
    };
    debug!(correlation_id = id, timeout = ?invocation.timeout, "call timed out");
    // This task is the timer; nothing to abort.
    invocation.timer = None;
    let duration = invocation.timeout;
    invocation.finish(Err(InvokeError::Timeout { duration }));
}
