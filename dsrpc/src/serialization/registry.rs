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

//! Runtime lookup of strategies by name.

use crate::serialization::{PostcardStrategy, SchemaStrategy, Strategy};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Strategies available to one process, keyed by name.
///
/// [`StrategyRegistry::default`] holds the built-in `"default"` and
/// `"schema"` strategies, plus `"json"` when the `json` feature is enabled.
/// Registering a strategy under an existing name replaces it.
///
/// # Examples
///
/// ```rust
/// use dsrpc::serialization::StrategyRegistry;
///
/// let strategies = StrategyRegistry::default();
/// assert!(strategies.get("default").is_some());
/// assert!(strategies.get("xml").is_none());
/// ```
pub struct StrategyRegistry {
    strategies: RwLock<HashMap<String, Arc<dyn Strategy>>>,
}

impl StrategyRegistry {
    /// Creates a registry with no strategies.
    pub fn empty() -> Self {
        Self {
            strategies: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces a strategy under its own name.
    pub fn register(&self, strategy: Arc<dyn Strategy>) {
        let name = strategy.name().to_string();
        self.strategies.write().insert(name, strategy);
    }

    /// Looks up a strategy.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.read().get(name).cloned()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.strategies.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let registry = Self::empty();
        registry.register(Arc::new(PostcardStrategy::default()));
        registry.register(Arc::new(SchemaStrategy::new()));
        #[cfg(feature = "json")]
        registry.register(Arc::new(crate::serialization::JsonStrategy::default()));
        registry
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_strategies() {
        let registry = StrategyRegistry::default();
        assert_eq!(registry.get("default").unwrap().name(), "default");
        assert_eq!(registry.get("schema").unwrap().name(), "schema");
        #[cfg(feature = "json")]
        assert_eq!(registry.names(), vec!["default", "json", "schema"]);
    }

    #[test]
    fn test_register_replaces() {
        let registry = StrategyRegistry::empty();
        assert!(registry.names().is_empty());
        registry.register(Arc::new(PostcardStrategy::default()));
        registry.register(Arc::new(PostcardStrategy::default()));
        assert_eq!(registry.names(), vec!["default"]);
    }
}
