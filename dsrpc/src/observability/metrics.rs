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

//! Invocation counters.
//!
//! Counters are atomics so both invokers can record from any task. When the
//! `observability` feature is enabled every increment is also forwarded to
//! the `metrics` crate.

use crate::service::InvokeError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for calls issued by a client and requests served by a server.
///
/// # Examples
///
/// ```rust
/// use dsrpc::observability::InvocationMetrics;
/// use std::time::Duration;
///
/// let metrics = InvocationMetrics::new();
/// metrics.record_call_started();
/// metrics.record_call_succeeded(Duration::from_millis(4));
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.calls_started, 1);
/// assert_eq!(snapshot.calls_succeeded, 1);
/// assert_eq!(snapshot.in_flight(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InvocationMetrics {
    calls_started: AtomicU64,
    calls_succeeded: AtomicU64,
    calls_faulted: AtomicU64,
    calls_timed_out: AtomicU64,
    calls_connection_lost: AtomicU64,
    calls_failed: AtomicU64,
    requests_dispatched: AtomicU64,
    dispatch_faults: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    total_latency_us: AtomicU64,
    latency_count: AtomicU64,
}

impl InvocationMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call that was handed to the connection.
    pub fn record_call_started(&self) {
        self.calls_started.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("dsrpc.client.calls.started").increment(1);
    }

    /// Records a call that returned a value.
    pub fn record_call_succeeded(&self, latency: Duration) {
        self.calls_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
        #[cfg(feature = "observability")]
        metrics::counter!("dsrpc.client.calls.succeeded").increment(1);
    }

    /// Records a failed call under the counter matching its error.
    pub fn record_call_failed(&self, error: &InvokeError) {
        let counter = match error {
            InvokeError::Fault(_) => &self.calls_faulted,
            InvokeError::Timeout { .. } => &self.calls_timed_out,
            InvokeError::ConnectionClosed => &self.calls_connection_lost,
            _ => &self.calls_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            let kind = match error {
                InvokeError::Fault(_) => "fault",
                InvokeError::Timeout { .. } => "timeout",
                InvokeError::ConnectionClosed => "connection_closed",
                _ => "other",
            };
            metrics::counter!("dsrpc.client.calls.failed", "kind" => kind).increment(1);
        }
    }

    /// Records a request the server resolved and invoked.
    pub fn record_request_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("dsrpc.server.requests.dispatched").increment(1);
    }

    /// Records a fault produced by the server, from dispatch or the target.
    pub fn record_dispatch_fault(&self, class: &str) {
        self.dispatch_faults.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("dsrpc.server.faults", "class" => class.to_string()).increment(1);
        #[cfg(not(feature = "observability"))]
        let _ = class;
    }

    /// Records an opened connection.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("dsrpc.connections.opened").increment(1);
            metrics::gauge!("dsrpc.connections.active").increment(1.0);
        }
    }

    /// Records a closed connection.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("dsrpc.connections.closed").increment(1);
            metrics::gauge!("dsrpc.connections.active").decrement(1.0);
        }
    }

    fn record_latency(&self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::histogram!("dsrpc.client.latency_us").record(us as f64);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let latency_count = load(&self.latency_count);
        MetricsSnapshot {
            calls_started: load(&self.calls_started),
            calls_succeeded: load(&self.calls_succeeded),
            calls_faulted: load(&self.calls_faulted),
            calls_timed_out: load(&self.calls_timed_out),
            calls_connection_lost: load(&self.calls_connection_lost),
            calls_failed: load(&self.calls_failed),
            requests_dispatched: load(&self.requests_dispatched),
            dispatch_faults: load(&self.dispatch_faults),
            connections_opened: load(&self.connections_opened),
            connections_closed: load(&self.connections_closed),
            average_latency_us: load(&self.total_latency_us)
                .checked_div(latency_count)
                .unwrap_or(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.calls_started,
            &self.calls_succeeded,
            &self.calls_faulted,
            &self.calls_timed_out,
            &self.calls_connection_lost,
            &self.calls_failed,
            &self.requests_dispatched,
            &self.dispatch_faults,
            &self.connections_opened,
            &self.connections_closed,
            &self.total_latency_us,
            &self.latency_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of [`InvocationMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Calls handed to a connection.
    pub calls_started: u64,
    /// Calls that returned a value.
    pub calls_succeeded: u64,
    /// Calls answered with a fault.
    pub calls_faulted: u64,
    /// Calls whose deadline elapsed.
    pub calls_timed_out: u64,
    /// Calls failed because their connection closed.
    pub calls_connection_lost: u64,
    /// Calls failed for any other reason.
    pub calls_failed: u64,
    /// Requests resolved and invoked by a server.
    pub requests_dispatched: u64,
    /// Faults produced by a server.
    pub dispatch_faults: u64,
    /// Connections opened.
    pub connections_opened: u64,
    /// Connections closed.
    pub connections_closed: u64,
    /// Mean latency of successful calls in microseconds.
    pub average_latency_us: u64,
}

impl MetricsSnapshot {
    /// Calls started but not yet completed.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.calls_started.saturating_sub(
            self.calls_succeeded
                + self.calls_faulted
                + self.calls_timed_out
                + self.calls_connection_lost
                + self.calls_failed,
        )
    }

    /// Connections currently open.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.connections_opened.saturating_sub(self.connections_closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Fault;

    #[test]
    fn test_failures_are_classified() {
        let metrics = InvocationMetrics::new();
        for _ in 0..5 {
            metrics.record_call_started();
        }
        metrics.record_call_failed(&InvokeError::Fault(Fault::application("x")));
        metrics.record_call_failed(&InvokeError::Timeout {
            duration: Duration::from_millis(1),
        });
        metrics.record_call_failed(&InvokeError::ConnectionClosed);
        metrics.record_call_failed(&InvokeError::UnknownStrategy { name: "x".into() });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.calls_faulted, 1);
        assert_eq!(snapshot.calls_timed_out, 1);
        assert_eq!(snapshot.calls_connection_lost, 1);
        assert_eq!(snapshot.calls_failed, 1);
        assert_eq!(snapshot.in_flight(), 1);
    }

    #[test]
    fn test_latency_and_reset() {
        let metrics = InvocationMetrics::new();
        metrics.record_call_succeeded(Duration::from_micros(100));
        metrics.record_call_succeeded(Duration::from_micros(300));
        assert_eq!(metrics.snapshot().average_latency_us, 200);

        metrics.record_connection_opened();
        assert_eq!(metrics.snapshot().active_connections(), 1);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
