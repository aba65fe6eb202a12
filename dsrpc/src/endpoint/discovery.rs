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

//! The discovery collaborator: where endpoints are announced and how their
//! arrival, change and departure is observed.

use crate::endpoint::{EndpointDescription, EndpointError};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Publishes endpoint descriptions to the rest of the cluster.
pub trait Discovery: Send + Sync {
    /// Makes `endpoint` visible, replacing an earlier announcement with the
    /// same id.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Discovery`] if the store rejects it.
    fn announce(&self, endpoint: &EndpointDescription) -> Result<(), EndpointError>;

    /// Withdraws the endpoint with `endpoint_id`. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Discovery`] if the store rejects it.
    fn retract(&self, endpoint_id: &str) -> Result<(), EndpointError>;
}

/// Receives endpoint events from a discovery source.
pub trait EndpointEventListener: Send + Sync {
    /// An endpoint appeared.
    fn endpoint_added(&self, endpoint: &EndpointDescription);
    /// An endpoint's attributes changed.
    fn endpoint_updated(&self, endpoint: &EndpointDescription);
    /// An endpoint disappeared.
    fn endpoint_removed(&self, endpoint_id: &str);
}

enum Event {
    Added(EndpointDescription),
    Updated(EndpointDescription),
    Removed(String),
}

#[derive(Default)]
struct LocalState {
    endpoints: BTreeMap<String, EndpointDescription>,
    listeners: Vec<Weak<dyn EndpointEventListener>>,
}

/// In-process discovery that delivers announcements to subscribed listeners
/// synchronously.
///
/// Listeners are held weakly and dropped once their owner is gone. Every
/// listener sees events in the order the store applied them.
#[derive(Default)]
pub struct LocalDiscovery {
    state: Mutex<LocalState>,
    /// Held across a store change and its delivery. Reentrant so a listener
    /// may announce from its callback.
    delivery: ReentrantMutex<()>,
}

impl LocalDiscovery {
    /// Creates an empty discovery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener` and replays every known endpoint to it as added.
    pub fn subscribe<L: EndpointEventListener + 'static>(&self, listener: &Arc<L>) {
        let listener: Arc<dyn EndpointEventListener> = listener.clone();
        let _delivery = self.delivery.lock();
        let known: Vec<EndpointDescription> = {
            let mut state = self.state.lock();
            state.listeners.push(Arc::downgrade(&listener));
            state.endpoints.values().cloned().collect()
        };
        for endpoint in &known {
            listener.endpoint_added(endpoint);
        }
    }

    /// Every announced endpoint, ordered by id.
    pub fn endpoints(&self) -> Vec<EndpointDescription> {
        self.state.lock().endpoints.values().cloned().collect()
    }

    /// The announced endpoint with `endpoint_id`.
    pub fn endpoint(&self, endpoint_id: &str) -> Option<EndpointDescription> {
        self.state.lock().endpoints.get(endpoint_id).cloned()
    }

    fn listeners(&self) -> Vec<Arc<dyn EndpointEventListener>> {
        let mut state = self.state.lock();
        state.listeners.retain(|l| l.strong_count() > 0);
        state.listeners.iter().filter_map(Weak::upgrade).collect()
    }

    fn deliver(&self, event: Event) {
        for listener in self.listeners() {
            match &event {
                Event::Added(endpoint) => listener.endpoint_added(endpoint),
                Event::Updated(endpoint) => listener.endpoint_updated(endpoint),
                Event::Removed(id) => listener.endpoint_removed(id),
            }
        }
    }
}

impl Discovery for LocalDiscovery {
    fn announce(&self, endpoint: &EndpointDescription) -> Result<(), EndpointError> {
        let _delivery = self.delivery.lock();
        let previous = self
            .state
            .lock()
            .endpoints
            .insert(endpoint.id().to_string(), endpoint.clone());
        debug!(endpoint_id = endpoint.id(), update = previous.is_some(), "endpoint announced");
        self.deliver(match previous {
            Some(_) => Event::Updated(endpoint.clone()),
            None => Event::Added(endpoint.clone()),
        });
        Ok(())
    }

    fn retract(&self, endpoint_id: &str) -> Result<(), EndpointError> {
        let _delivery = self.delivery.lock();
        if self.state.lock().endpoints.remove(endpoint_id).is_some() {
            debug!(endpoint_id, "endpoint retracted");
            self.deliver(Event::Removed(endpoint_id.to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LocalDiscovery")
            .field("endpoints", &state.endpoints.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl EndpointEventListener for Recorder {
        fn endpoint_added(&self, endpoint: &EndpointDescription) {
            self.0.lock().push(format!("added {}", endpoint.id()));
        }
        fn endpoint_updated(&self, endpoint: &EndpointDescription) {
            self.0.lock().push(format!("updated {}", endpoint.id()));
        }
        fn endpoint_removed(&self, endpoint_id: &str) {
            self.0.lock().push(format!("removed {endpoint_id}"));
        }
    }

    fn endpoint(id: &str) -> EndpointDescription {
        EndpointDescription::builder(id)
            .interface("I")
            .process_uuid("p")
            .address(&"tcp://127.0.0.1:1".parse().unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_fan_out_and_replay() {
        let discovery = LocalDiscovery::new();
        discovery.announce(&endpoint("a")).unwrap();

        let recorder = Arc::new(Recorder::default());
        discovery.subscribe(&recorder);
        discovery.announce(&endpoint("b")).unwrap();
        discovery.announce(&endpoint("a")).unwrap();
        discovery.retract("b").unwrap();
        discovery.retract("missing").unwrap();

        assert_eq!(
            *recorder.0.lock(),
            vec!["added a", "added b", "updated a", "removed b"]
        );
        assert_eq!(discovery.endpoints().len(), 1);
        assert!(discovery.endpoint("a").is_some());
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        let discovery = LocalDiscovery::new();
        let recorder = Arc::new(Recorder::default());
        discovery.subscribe(&recorder);
        drop(recorder);
        discovery.announce(&endpoint("a")).unwrap();
        assert!(discovery.state.lock().listeners.is_empty());
    }

    struct SlowAdds(Recorder);

    impl EndpointEventListener for SlowAdds {
        fn endpoint_added(&self, endpoint: &EndpointDescription) {
            std::thread::sleep(std::time::Duration::from_millis(100));
            self.0.endpoint_added(endpoint);
        }
        fn endpoint_updated(&self, endpoint: &EndpointDescription) {
            self.0.endpoint_updated(endpoint);
        }
        fn endpoint_removed(&self, endpoint_id: &str) {
            self.0.endpoint_removed(endpoint_id);
        }
    }

    #[test]
    fn test_concurrent_changes_are_delivered_in_store_order() {
        let discovery = Arc::new(LocalDiscovery::new());
        let listener = Arc::new(SlowAdds(Recorder::default()));
        discovery.subscribe(&listener);

        let announcer = {
            let discovery = discovery.clone();
            std::thread::spawn(move || discovery.announce(&endpoint("a")).unwrap())
        };
        while discovery.endpoint("a").is_none() {
            std::thread::yield_now();
        }
        discovery.retract("a").unwrap();
        announcer.join().unwrap();

        assert!(discovery.endpoints().is_empty());
        assert_eq!(*listener.0.0.lock(), vec!["added a", "removed a"]);
    }

    #[test]
    fn test_listener_may_announce_from_callback() {
        struct Echo(Arc<LocalDiscovery>, Recorder);

        impl EndpointEventListener for Echo {
            fn endpoint_added(&self, endpoint: &EndpointDescription) {
                self.1.endpoint_added(endpoint);
                if endpoint.id() == "a" {
                    self.0.announce(&self::endpoint("b")).unwrap();
                }
            }
            fn endpoint_updated(&self, endpoint: &EndpointDescription) {
                self.1.endpoint_updated(endpoint);
            }
            fn endpoint_removed(&self, endpoint_id: &str) {
                self.1.endpoint_removed(endpoint_id);
            }
        }

        let discovery = Arc::new(LocalDiscovery::new());
        let echo = Arc::new(Echo(discovery.clone(), Recorder::default()));
        discovery.subscribe(&echo);
        discovery.announce(&endpoint("a")).unwrap();
        assert_eq!(*echo.1.0.lock(), vec!["added a", "added b"]);
    }
}
