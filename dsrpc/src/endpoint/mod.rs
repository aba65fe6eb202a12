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

//! Endpoint layer: descriptions of exported services, discovery, and the
//! registry that turns matching remote endpoints into local proxies.
//!
//! # Overview
//!
//! - **[`EndpointDescription`]**: the validated attribute bag advertising one
//!   exported service (`endpoint.id`, `service.interfaces`,
//!   `endpoint.process.uuid`, `endpoint.address` plus caller properties).
//! - **[`Discovery`]**: where descriptions are announced and retracted.
//!   [`LocalDiscovery`] is the in-process implementation.
//! - **[`ServiceHost`]**: where proxies of imported endpoints are published.
//!   [`MemoryHost`] keeps them in memory.
//! - **[`EndpointRegistry`]**: matches endpoints against interest filters,
//!   reference-counts the resulting imports and exports local services.
//!
//! # Import lifecycle
//!
//! ```text
//!   interest added ──┐            ┌── endpoint added / updated
//!                    ▼            ▼
//!              filter matches endpoint?
//!                    │ yes
//!                    ▼
//!   import exists? ── no ──> create proxy, ServiceHost::publish
//!                    │ yes
//!                    ▼
//!            refcount += 1
//!
//!   interest removed / stops matching ──> refcount -= 1, at zero unpublish
//!   endpoint removed                  ──> unpublish regardless of refcount
//! ```

mod config;
mod description;
mod discovery;
mod error;
mod host;
mod registry;

pub use self::config::RegistryConfig;
pub use self::description::{
    EndpointDescription, EndpointDescriptionBuilder, ENDPOINT_ADDRESS, ENDPOINT_ID,
    ENDPOINT_PROCESS_UUID, SERVICE_INTERFACES,
};
pub use self::discovery::{Discovery, EndpointEventListener, LocalDiscovery};
pub use self::error::EndpointError;
pub use self::host::{HostEvent, MemoryHost, ServiceHost};
pub use self::registry::EndpointRegistry;
