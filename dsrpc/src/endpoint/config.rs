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

//! Configuration for the endpoint registry.

use crate::capability::DEFAULT_INDEXED_ATTRIBUTES;
use uuid::Uuid;

/// Configuration for an [`EndpointRegistry`](super::EndpointRegistry).
///
/// # Examples
///
/// ```rust
/// use dsrpc::endpoint::RegistryConfig;
///
/// let config = RegistryConfig {
///     indexed_attributes: vec!["service.interfaces".into(), "region".into()],
///     ..Default::default()
/// };
/// assert_eq!(config.indexed_attributes.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Identity of this process, advertised as `endpoint.process.uuid`.
    ///
    /// Endpoints carrying this id are never imported by the registry.
    ///
    /// Default: a fresh random (v4) UUID
    pub process_uuid: Uuid,

    /// Attributes indexed by the registry's capability set.
    ///
    /// Default: `service.interfaces`, `endpoint.id`, `endpoint.process.uuid`
    pub indexed_attributes: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            process_uuid: Uuid::new_v4(),
            indexed_attributes: DEFAULT_INDEXED_ATTRIBUTES
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let a = RegistryConfig::default();
        let b = RegistryConfig::default();
        assert_ne!(a.process_uuid, b.process_uuid);
        assert!(a.indexed_attributes.iter().any(|k| k == "endpoint.id"));
    }
}
