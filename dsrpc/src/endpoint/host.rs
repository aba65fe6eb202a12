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

//! The host collaborator that makes imported proxies available locally.

use crate::client::Proxy;
use crate::endpoint::EndpointDescription;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Receives the proxies of imported endpoints.
///
/// Calls arrive after the registry released its internal lock, in the order
/// the registry processed the events that caused them.
pub trait ServiceHost: Send + Sync {
    /// A proxy for `endpoint` became available.
    fn publish(&self, endpoint: &EndpointDescription, proxy: Proxy);

    /// The attributes of a published endpoint changed. The proxy is the same.
    fn update(&self, endpoint: &EndpointDescription);

    /// The proxy for `endpoint_id` must no longer be used.
    fn unpublish(&self, endpoint_id: &str);
}

/// A call received by a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// `publish` for the endpoint id.
    Published(String),
    /// `update` for the endpoint id.
    Updated(String),
    /// `unpublish` for the endpoint id.
    Unpublished(String),
}

#[derive(Default)]
struct MemoryHostState {
    published: BTreeMap<String, (EndpointDescription, Proxy)>,
    events: Vec<HostEvent>,
}

/// A host that keeps published proxies in memory and records every call.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<MemoryHostState>,
}

impl MemoryHost {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// The published proxy for `endpoint_id`.
    pub fn proxy(&self, endpoint_id: &str) -> Option<Proxy> {
        self.state
            .lock()
            .published
            .get(endpoint_id)
            .map(|(_, proxy)| proxy.clone())
    }

    /// The latest description of a published endpoint.
    pub fn endpoint(&self, endpoint_id: &str) -> Option<EndpointDescription> {
        self.state
            .lock()
            .published
            .get(endpoint_id)
            .map(|(endpoint, _)| endpoint.clone())
    }

    /// Ids of the published endpoints, in order.
    pub fn published_ids(&self) -> Vec<String> {
        self.state.lock().published.keys().cloned().collect()
    }

    /// Every call received so far.
    pub fn events(&self) -> Vec<HostEvent> {
        self.state.lock().events.clone()
    }
}

impl ServiceHost for MemoryHost {
    fn publish(&self, endpoint: &EndpointDescription, proxy: Proxy) {
        let mut state = self.state.lock();
        state.events.push(HostEvent::Published(endpoint.id().to_string()));
        state
            .published
            .insert(endpoint.id().to_string(), (endpoint.clone(), proxy));
    }

    fn update(&self, endpoint: &EndpointDescription) {
        let mut state = self.state.lock();
        state.events.push(HostEvent::Updated(endpoint.id().to_string()));
        if let Some((current, _)) = state.published.get_mut(endpoint.id()) {
            *current = endpoint.clone();
        }
    }

    fn unpublish(&self, endpoint_id: &str) {
        let mut state = self.state.lock();
        state.events.push(HostEvent::Unpublished(endpoint_id.to_string()));
        state.published.remove(endpoint_id);
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("published", &self.published_ids())
            .finish()
    }
}
