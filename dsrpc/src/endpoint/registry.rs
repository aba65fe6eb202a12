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

//! The endpoint registry: matches known endpoints against local interests,
//! maintains the resulting imports and exports local services.

use crate::capability::CapabilitySet;
use crate::client::{ClientInvoker, Proxy};
use crate::endpoint::{
    Discovery, EndpointDescription, EndpointError, EndpointEventListener, RegistryConfig,
    ServiceHost,
};
use crate::filter::Filter;
use crate::properties::Properties;
use crate::server::ServerInvoker;
use crate::service::{InterfaceDescriptor, ServiceObject};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of an interest: its owner and the canonical filter text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct InterestKey {
    owner: String,
    filter: String,
}

struct Interest {
    filter: Filter,
    /// Ids of the endpoints this interest currently holds an import on.
    matched: BTreeSet<String>,
}

/// One imported endpoint. The reference count is `interests.len()`.
struct ImportRegistration {
    endpoint: Arc<EndpointDescription>,
    proxy: Proxy,
    interests: BTreeSet<InterestKey>,
}

/// Host calls collected under the state lock and made after releasing it.
enum HostAction {
    Publish(Arc<EndpointDescription>, Proxy),
    Update(Arc<EndpointDescription>),
    Unpublish(String),
}

struct RegistryState {
    endpoints: CapabilitySet<EndpointDescription>,
    interests: BTreeMap<InterestKey, Interest>,
    imports: BTreeMap<String, ImportRegistration>,
    exports: BTreeMap<String, EndpointDescription>,
    interfaces: HashMap<String, Arc<InterfaceDescriptor>>,
}

impl RegistryState {
    fn interface_for(&self, endpoint: &EndpointDescription) -> Arc<InterfaceDescriptor> {
        let name = endpoint.interfaces().first().copied().unwrap_or_default();
        self.interfaces
            .get(name)
            .cloned()
            .unwrap_or_else(|| Arc::new(InterfaceDescriptor::new(name)))
    }

    /// Binds `key` to the import of `endpoint`, creating the import if needed.
    fn attach(
        &mut self,
        client: &ClientInvoker,
        key: &InterestKey,
        endpoint: &Arc<EndpointDescription>,
        actions: &mut Vec<HostAction>,
    ) {
        if let Some(import) = self.imports.get_mut(endpoint.id()) {
            import.interests.insert(key.clone());
            return;
        }
        let interface = self.interface_for(endpoint);
        let proxy = client.proxy(endpoint.address().clone(), endpoint.id(), interface);
        self.imports.insert(
            endpoint.id().to_string(),
            ImportRegistration {
                endpoint: endpoint.clone(),
                proxy: proxy.clone(),
                interests: BTreeSet::from([key.clone()]),
            },
        );
        actions.push(HostAction::Publish(endpoint.clone(), proxy));
    }

    /// Releases `key`'s hold on the import of `endpoint_id`, tearing the
    /// import down when nothing holds it any more.
    fn detach(&mut self, key: &InterestKey, endpoint_id: &str, actions: &mut Vec<HostAction>) {
        let Some(import) = self.imports.get_mut(endpoint_id) else {
            return;
        };
        import.interests.remove(key);
        if import.interests.is_empty() {
            self.imports.remove(endpoint_id);
            actions.push(HostAction::Unpublish(endpoint_id.to_string()));
        }
    }

    fn add_endpoint(&mut self, client: &ClientInvoker, endpoint: EndpointDescription) -> Vec<HostAction> {
        let endpoint = self.endpoints.add_capability(endpoint);
        let matching: Vec<InterestKey> = self
            .interests
            .iter()
            .filter(|(_, interest)| interest.filter.matches(&*endpoint))
            .map(|(key, _)| key.clone())
            .collect();
        let mut actions = Vec::new();
        for key in &matching {
            if let Some(interest) = self.interests.get_mut(key) {
                interest.matched.insert(endpoint.id().to_string());
            }
            self.attach(client, key, &endpoint, &mut actions);
        }
        actions
    }

    fn update_endpoint(&mut self, client: &ClientInvoker, endpoint: EndpointDescription) -> Vec<HostAction> {
        let endpoint = self.endpoints.add_capability(endpoint);
        let id = endpoint.id().to_string();
        let had_import = match self.imports.get_mut(&id) {
            Some(import) => {
                import.endpoint = endpoint.clone();
                true
            }
            None => false,
        };

        let mut gained = Vec::new();
        let mut lost = Vec::new();
        for (key, interest) in &mut self.interests {
            let was = interest.matched.contains(&id);
            let now = interest.filter.matches(&*endpoint);
            if was && !now {
                interest.matched.remove(&id);
                lost.push(key.clone());
            } else if now && !was {
                interest.matched.insert(id.clone());
                gained.push(key.clone());
            }
        }

        let mut actions = Vec::new();
        if had_import {
            actions.push(HostAction::Update(endpoint.clone()));
        }
        for key in &gained {
            self.attach(client, key, &endpoint, &mut actions);
        }
        for key in &lost {
            self.detach(key, &id, &mut actions);
        }
        actions
    }

    fn remove_endpoint(&mut self, endpoint_id: &str) -> Vec<HostAction> {
        self.endpoints.remove_capability(endpoint_id);
        for interest in self.interests.values_mut() {
            interest.matched.remove(endpoint_id);
        }
        match self.imports.remove(endpoint_id) {
            Some(_) => vec![HostAction::Unpublish(endpoint_id.to_string())],
            None => Vec::new(),
        }
    }
}

/// Tracks remote endpoints, imports those matching local interests and
/// exports local services.
///
/// Each method applies its event completely before returning: state changes
/// happen under one lock and the resulting [`ServiceHost`] calls are made
/// after releasing it. Events are applied in call order.
///
/// # Examples
///
/// ```rust,no_run
/// use dsrpc::client::{ClientConfig, ClientInvoker};
/// use dsrpc::endpoint::{EndpointRegistry, LocalDiscovery, MemoryHost, RegistryConfig};
/// use dsrpc::server::{ServerConfig, ServerInvoker};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = Arc::new(ServerInvoker::new(ServerConfig::default()));
/// server.bind(&"tcp://127.0.0.1:0".parse()?).await?;
///
/// let discovery = Arc::new(LocalDiscovery::new());
/// let host = Arc::new(MemoryHost::new());
/// let registry = Arc::new(EndpointRegistry::new(
///     RegistryConfig::default(),
///     server,
///     Arc::new(ClientInvoker::new(ClientConfig::default())),
///     discovery.clone(),
///     host.clone(),
/// ));
/// discovery.subscribe(&registry);
///
/// registry.add_interest("billing", "(service.interfaces=com.acme.Ledger)")?;
/// # Ok(())
/// # }
/// ```
pub struct EndpointRegistry {
    process_uuid: String,
    server: Arc<ServerInvoker>,
    client: Arc<ClientInvoker>,
    discovery: Arc<dyn Discovery>,
    host: Arc<dyn ServiceHost>,
    state: Mutex<RegistryState>,
    events: ReentrantMutex<()>,
}

impl EndpointRegistry {
    /// Creates a registry exporting through `server`, importing through
    /// `client`, announcing to `discovery` and publishing proxies to `host`.
    pub fn new(
        config: RegistryConfig,
        server: Arc<ServerInvoker>,
        client: Arc<ClientInvoker>,
        discovery: Arc<dyn Discovery>,
        host: Arc<dyn ServiceHost>,
    ) -> Self {
        Self {
            process_uuid: config.process_uuid.to_string(),
            server,
            client,
            discovery,
            host,
            state: Mutex::new(RegistryState {
                endpoints: CapabilitySet::new(&config.indexed_attributes),
                interests: BTreeMap::new(),
                imports: BTreeMap::new(),
                exports: BTreeMap::new(),
                interfaces: HashMap::new(),
            }),
            events: ReentrantMutex::new(()),
        }
    }

    /// This process's id as advertised in exported descriptions.
    pub fn process_uuid(&self) -> &str {
        &self.process_uuid
    }

    /// Makes `interface` the descriptor given to proxies of endpoints whose
    /// first interface has that name. Endpoints with an unregistered
    /// interface get a descriptor without methods, which leaves overload
    /// resolution to the remote side.
    pub fn register_interface(&self, interface: Arc<InterfaceDescriptor>) {
        self.state
            .lock()
            .interfaces
            .insert(interface.name().to_string(), interface);
    }

    /// Installs a standing interest of `owner` in endpoints matching
    /// `filter`, importing every endpoint that already matches.
    ///
    /// Returns `false` if the same owner already holds the same filter.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidFilter`] if `filter` does not parse;
    /// nothing is installed in that case.
    pub fn add_interest(&self, owner: &str, filter: &str) -> Result<bool, EndpointError> {
        let filter = Filter::parse(filter)?;
        let key = InterestKey {
            owner: owner.to_string(),
            filter: filter.to_string(),
        };
        let _events = self.events.lock();
        let actions = {
            let mut state = self.state.lock();
            if state.interests.contains_key(&key) {
                return Ok(false);
            }
            let mut actions = Vec::new();
            let matched = state.endpoints.matches(&filter);
            for endpoint in &matched {
                state.attach(&self.client, &key, endpoint, &mut actions);
            }
            let matched = matched.iter().map(|e| e.id().to_string()).collect();
            debug!(owner, filter = %key.filter, "interest added");
            state.interests.insert(key, Interest { filter, matched });
            actions
        };
        self.run(actions);
        Ok(true)
    }

    /// Removes an interest, releasing its imports.
    ///
    /// Returns `false` if no such interest was installed.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidFilter`] if `filter` does not parse.
    pub fn remove_interest(&self, owner: &str, filter: &str) -> Result<bool, EndpointError> {
        let key = InterestKey {
            owner: owner.to_string(),
            filter: Filter::parse(filter)?.to_string(),
        };
        let _events = self.events.lock();
        let actions = {
            let mut state = self.state.lock();
            let Some(interest) = state.interests.remove(&key) else {
                return Ok(false);
            };
            let mut actions = Vec::new();
            for endpoint_id in &interest.matched {
                state.detach(&key, endpoint_id, &mut actions);
            }
            debug!(owner, filter = %key.filter, "interest removed");
            actions
        };
        self.run(actions);
        Ok(true)
    }

    /// Applies a discovery add. An add for a known endpoint is an update.
    pub fn on_endpoint_added(&self, endpoint: EndpointDescription) {
        if self.is_local(&endpoint) {
            return;
        }
        let _events = self.events.lock();
        let actions = {
            let mut state = self.state.lock();
            if state.endpoints.get(endpoint.id()).is_some() {
                state.update_endpoint(&self.client, endpoint)
            } else {
                debug!(endpoint_id = endpoint.id(), "endpoint added");
                state.add_endpoint(&self.client, endpoint)
            }
        };
        self.run(actions);
    }

    /// Applies a discovery update. An update for an unknown endpoint is an
    /// add.
    pub fn on_endpoint_updated(&self, endpoint: EndpointDescription) {
        if self.is_local(&endpoint) {
            return;
        }
        let _events = self.events.lock();
        let actions = {
            let mut state = self.state.lock();
            if state.endpoints.get(endpoint.id()).is_some() {
                debug!(endpoint_id = endpoint.id(), "endpoint updated");
                state.update_endpoint(&self.client, endpoint)
            } else {
                state.add_endpoint(&self.client, endpoint)
            }
        };
        self.run(actions);
    }

    /// Applies a discovery delete, tearing down the endpoint's import
    /// however many interests hold it.
    pub fn on_endpoint_removed(&self, endpoint_id: &str) {
        let _events = self.events.lock();
        let actions = self.state.lock().remove_endpoint(endpoint_id);
        debug!(endpoint_id, "endpoint removed");
        self.run(actions);
    }

    /// Exports `service` under a new endpoint id and announces it.
    ///
    /// The description carries the service's interface name, this process's
    /// id, the server's address and `properties`.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::NotBound`] if the server has no address,
    /// and the registration or discovery error otherwise. A failed export
    /// leaves nothing registered.
    pub fn export_service(
        &self,
        service: Arc<dyn ServiceObject>,
        properties: &Properties,
    ) -> Result<EndpointDescription, EndpointError> {
        let address = self.server.local_address().ok_or(EndpointError::NotBound)?;
        let endpoint_id = Uuid::new_v4().to_string();
        let endpoint = EndpointDescription::builder(endpoint_id.clone())
            .interface(service.interface().name())
            .process_uuid(&self.process_uuid)
            .address(&address)
            .properties(properties)
            .build()?;

        self.server.register_instance(endpoint_id.clone(), service)?;
        if let Err(e) = self.discovery.announce(&endpoint) {
            warn!(%endpoint_id, error = %e, "announcement failed, rolling back export");
            self.server.unregister_service(&endpoint_id);
            return Err(e);
        }
        self.state
            .lock()
            .exports
            .insert(endpoint_id.clone(), endpoint.clone());
        info!(%endpoint_id, %address, "service exported");
        Ok(endpoint)
    }

    /// Withdraws an export. The service stops being callable before the
    /// endpoint is retracted.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::NotExported`] for unknown ids and the
    /// discovery error if the retraction fails.
    pub fn unexport_service(&self, endpoint_id: &str) -> Result<(), EndpointError> {
        if self.state.lock().exports.remove(endpoint_id).is_none() {
            return Err(EndpointError::NotExported {
                endpoint_id: endpoint_id.to_string(),
            });
        }
        self.server.unregister_service(endpoint_id);
        self.discovery.retract(endpoint_id)?;
        info!(endpoint_id, "service unexported");
        Ok(())
    }

    /// Ids of the known remote endpoints.
    pub fn endpoint_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .endpoints
            .all()
            .iter()
            .map(|e| e.id().to_string())
            .collect()
    }

    /// Ids of the imported endpoints.
    pub fn imported_ids(&self) -> Vec<String> {
        self.state.lock().imports.keys().cloned().collect()
    }

    /// Number of interests holding the import of `endpoint_id`; zero if it
    /// is not imported.
    pub fn import_refcount(&self, endpoint_id: &str) -> usize {
        self.state
            .lock()
            .imports
            .get(endpoint_id)
            .map_or(0, |import| import.interests.len())
    }

    /// The proxy of an imported endpoint.
    pub fn proxy(&self, endpoint_id: &str) -> Option<Proxy> {
        self.state
            .lock()
            .imports
            .get(endpoint_id)
            .map(|import| import.proxy.clone())
    }

    /// The description an import was last published or updated with.
    pub fn imported_endpoint(&self, endpoint_id: &str) -> Option<EndpointDescription> {
        self.state
            .lock()
            .imports
            .get(endpoint_id)
            .map(|import| EndpointDescription::clone(&import.endpoint))
    }

    /// Descriptions of this registry's exports.
    pub fn exports(&self) -> Vec<EndpointDescription> {
        self.state.lock().exports.values().cloned().collect()
    }

    /// Number of installed interests.
    pub fn interest_count(&self) -> usize {
        self.state.lock().interests.len()
    }

    fn is_local(&self, endpoint: &EndpointDescription) -> bool {
        let local = endpoint.process_uuid() == self.process_uuid;
        if local {
            debug!(endpoint_id = endpoint.id(), "ignoring endpoint of this process");
        }
        local
    }

    fn run(&self, actions: Vec<HostAction>) {
        for action in actions {
            match action {
                HostAction::Publish(endpoint, proxy) => {
                    info!(endpoint_id = endpoint.id(), address = %endpoint.address(), "import published");
                    self.host.publish(&endpoint, proxy);
                }
                HostAction::Update(endpoint) => {
                    debug!(endpoint_id = endpoint.id(), "import updated");
                    self.host.update(&endpoint);
                }
                HostAction::Unpublish(endpoint_id) => {
                    info!(%endpoint_id, "import unpublished");
                    self.host.unpublish(&endpoint_id);
                }
            }
        }
    }
}

impl EndpointEventListener for EndpointRegistry {
    fn endpoint_added(&self, endpoint: &EndpointDescription) {
        self.on_endpoint_added(endpoint.clone());
    }

    fn endpoint_updated(&self, endpoint: &EndpointDescription) {
        self.on_endpoint_updated(endpoint.clone());
    }

    fn endpoint_removed(&self, endpoint_id: &str) {
        self.on_endpoint_removed(endpoint_id);
    }
}

impl std::fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EndpointRegistry")
            .field("process_uuid", &self.process_uuid)
            .field("endpoints", &state.endpoints.len())
            .field("interests", &state.interests.len())
            .field("imports", &state.imports.len())
            .field("exports", &state.exports.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::endpoint::{HostEvent, LocalDiscovery, MemoryHost};
    use crate::server::ServerConfig;
    use crate::service::{MethodDescriptor, ServiceBuilder};
    use crate::transport::Address;
    use crate::value::{Value, ValueType};

    struct Fixture {
        registry: EndpointRegistry,
        host: Arc<MemoryHost>,
        discovery: Arc<LocalDiscovery>,
        server: Arc<ServerInvoker>,
    }

    fn fixture() -> Fixture {
        let server = Arc::new(ServerInvoker::new(ServerConfig::default()));
        let host = Arc::new(MemoryHost::new());
        let discovery = Arc::new(LocalDiscovery::new());
        let registry = EndpointRegistry::new(
            RegistryConfig::default(),
            server.clone(),
            Arc::new(ClientInvoker::new(ClientConfig::default())),
            discovery.clone(),
            host.clone(),
        );
        Fixture {
            registry,
            host,
            discovery,
            server,
        }
    }

    fn remote(id: &str, interface: &str, region: &str) -> EndpointDescription {
        EndpointDescription::builder(id)
            .interface(interface)
            .process_uuid("remote-process")
            .address(&"tcp://127.0.0.1:4000".parse().unwrap())
            .property("region", region)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_interest_before_and_after_endpoint() {
        let f = fixture();
        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        assert!(f.registry.add_interest("o1", "(service.interfaces=Foo)").unwrap());
        assert_eq!(f.host.published_ids(), vec!["a"]);

        f.registry.on_endpoint_added(remote("b", "Foo", "west"));
        f.registry.on_endpoint_added(remote("c", "Bar", "east"));
        assert_eq!(f.host.published_ids(), vec!["a", "b"]);
        assert_eq!(f.registry.endpoint_ids(), vec!["a", "b", "c"]);
        assert_eq!(f.registry.proxy("a").unwrap().service_id(), "a");
    }

    #[tokio::test]
    async fn test_refcounted_imports() {
        let f = fixture();
        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        f.registry.add_interest("o1", "(service.interfaces=Foo)").unwrap();
        f.registry.add_interest("o2", "(region=east)").unwrap();
        assert_eq!(f.registry.import_refcount("a"), 2);
        assert_eq!(f.host.events(), vec![HostEvent::Published("a".into())]);

        assert!(f.registry.remove_interest("o1", "(service.interfaces=Foo)").unwrap());
        assert_eq!(f.registry.import_refcount("a"), 1);
        assert_eq!(f.host.published_ids(), vec!["a"]);

        assert!(!f.registry.remove_interest("o2", "(region=east )").unwrap());
        assert_eq!(f.registry.import_refcount("a"), 1);
        assert!(f.registry.remove_interest("o2", "( region=east)").unwrap());
        assert_eq!(f.registry.import_refcount("a"), 0);
        assert!(f.host.published_ids().is_empty());
        assert_eq!(f.registry.endpoint_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_removal_tears_down_regardless_of_refcount() {
        let f = fixture();
        f.registry.add_interest("o1", "(region=east)").unwrap();
        f.registry.add_interest("o2", "(service.interfaces=Foo)").unwrap();
        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        assert_eq!(f.registry.import_refcount("a"), 2);

        f.registry.on_endpoint_removed("a");
        assert!(f.registry.imported_ids().is_empty());
        assert!(f.host.published_ids().is_empty());

        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        assert_eq!(f.registry.import_refcount("a"), 2);
    }

    #[tokio::test]
    async fn test_duplicate_interest_is_idempotent() {
        let f = fixture();
        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        assert!(f.registry.add_interest("o1", "(region=east)").unwrap());
        assert!(!f.registry.add_interest("o1", "(region=east)").unwrap());
        assert_eq!(f.registry.import_refcount("a"), 1);
        assert_eq!(f.registry.interest_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_filter_installs_nothing() {
        let f = fixture();
        let error = f.registry.add_interest("o1", "(region=east").unwrap_err();
        assert!(matches!(error, EndpointError::InvalidFilter(_)));
        assert_eq!(f.registry.interest_count(), 0);
    }

    #[tokio::test]
    async fn test_update_rematches_and_keeps_proxy() {
        let f = fixture();
        f.registry.add_interest("o1", "(region=east)").unwrap();
        f.registry.add_interest("o2", "(service.interfaces=Foo)").unwrap();
        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        let before = f.host.proxy("a").unwrap();

        f.registry.on_endpoint_updated(remote("a", "Foo", "west"));
        assert_eq!(f.registry.import_refcount("a"), 1);
        let after = f.host.proxy("a").unwrap();
        assert_eq!(before.address(), after.address());
        assert_eq!(
            f.registry.imported_endpoint("a").unwrap().properties().get("region"),
            Some(&"west".into())
        );
        assert_eq!(
            f.host.events(),
            vec![HostEvent::Published("a".into()), HostEvent::Updated("a".into())]
        );

        f.registry.on_endpoint_updated(remote("a", "Bar", "north"));
        assert!(f.host.published_ids().is_empty());

        f.registry.on_endpoint_added(remote("a", "Bar", "east"));
        assert_eq!(f.host.published_ids(), vec!["a"]);
        f.registry.on_endpoint_updated(remote("z", "Foo", "south"));
        assert_eq!(f.host.published_ids(), vec!["a", "z"]);
    }

    #[tokio::test]
    async fn test_local_endpoints_are_ignored() {
        let f = fixture();
        f.registry.add_interest("o1", "(service.interfaces=Foo)").unwrap();
        let local = EndpointDescription::builder("mine")
            .interface("Foo")
            .process_uuid(f.registry.process_uuid())
            .address(&"tcp://127.0.0.1:4000".parse().unwrap())
            .build()
            .unwrap();
        f.registry.on_endpoint_added(local);
        assert!(f.registry.endpoint_ids().is_empty());
        assert!(f.host.events().is_empty());
    }

    fn greeter() -> Arc<dyn ServiceObject> {
        ServiceBuilder::new("com.acme.Greeter")
            .method_sync(
                MethodDescriptor::new("greet", vec![ValueType::String], ValueType::String),
                |args| {
                    let name: String = crate::service::arg(&args, 0)?;
                    Ok(Value::from(format!("hello {name}")))
                },
            )
            .build()
    }

    #[tokio::test]
    async fn test_export_requires_bound_server() {
        let f = fixture();
        let error = f.registry.export_service(greeter(), &Properties::new()).unwrap_err();
        assert!(matches!(error, EndpointError::NotBound));
    }

    #[tokio::test]
    async fn test_export_and_unexport() {
        let f = fixture();
        let address = f
            .server
            .bind(&Address::tcp("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();
        let endpoint = f
            .registry
            .export_service(greeter(), &Properties::new().with("region", "east"))
            .unwrap();

        assert_eq!(endpoint.address(), &address);
        assert_eq!(endpoint.interfaces(), vec!["com.acme.Greeter"]);
        assert_eq!(endpoint.process_uuid(), f.registry.process_uuid());
        assert!(f.server.is_registered(endpoint.id()));
        assert_eq!(f.discovery.endpoint(endpoint.id()), Some(endpoint.clone()));
        assert_eq!(f.registry.exports(), vec![endpoint.clone()]);

        f.registry.unexport_service(endpoint.id()).unwrap();
        assert!(!f.server.is_registered(endpoint.id()));
        assert!(f.discovery.endpoints().is_empty());
        assert!(matches!(
            f.registry.unexport_service(endpoint.id()),
            Err(EndpointError::NotExported { .. })
        ));
    }

    struct FailingDiscovery;

    impl Discovery for FailingDiscovery {
        fn announce(&self, _: &EndpointDescription) -> Result<(), EndpointError> {
            Err(EndpointError::Discovery {
                reason: "store offline".into(),
            })
        }
        fn retract(&self, _: &str) -> Result<(), EndpointError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_announcement_rolls_back() {
        let server = Arc::new(ServerInvoker::new(ServerConfig::default()));
        server
            .bind(&Address::tcp("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();
        let registry = EndpointRegistry::new(
            RegistryConfig::default(),
            server.clone(),
            Arc::new(ClientInvoker::new(ClientConfig::default())),
            Arc::new(FailingDiscovery),
            Arc::new(MemoryHost::new()),
        );
        let error = registry.export_service(greeter(), &Properties::new()).unwrap_err();
        assert!(error.is_recoverable());
        assert!(registry.exports().is_empty());
        assert!(format!("{server:?}").contains("services: 0"));
    }

    #[tokio::test]
    async fn test_registered_interface_reaches_proxy() {
        let f = fixture();
        let interface = Arc::new(InterfaceDescriptor::new("Foo").with_method(MethodDescriptor::new(
            "ping",
            vec![],
            ValueType::Null,
        )));
        f.registry.register_interface(interface.clone());
        f.registry.add_interest("o1", "(service.interfaces=Foo)").unwrap();
        f.registry.on_endpoint_added(remote("a", "Foo", "east"));
        assert!(Arc::ptr_eq(f.host.proxy("a").unwrap().interface(), &interface));
    }
}
