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

//! Indexed sets of attribute bags queried by filter.
//!
//! A [`CapabilitySet`] keeps an inverted index (attribute → value → ids) for
//! a configurable list of attributes. Filters whose top level is an equality
//! on an indexed attribute, or a conjunction containing one, are evaluated
//! only against the indexed candidates; everything else scans the whole set.
//!
//! # Examples
//!
//! ```rust
//! use dsrpc::capability::{Capability, CapabilitySet};
//! use dsrpc::filter::Filter;
//! use dsrpc::properties::{AttributeSource, Properties, PropertyValue};
//!
//! struct Bag(String, Properties);
//!
//! impl AttributeSource for Bag {
//!     fn attribute(&self, key: &str) -> Option<&PropertyValue> {
//!         self.1.get(key)
//!     }
//! }
//!
//! impl Capability for Bag {
//!     fn id(&self) -> &str {
//!         &self.0
//!     }
//! }
//!
//! let set = CapabilitySet::new(["class"]);
//! set.add_capability(Bag("a".into(), Properties::new().with("class", "Foo")));
//! set.add_capability(Bag("b".into(), Properties::new().with("class", "Bar")));
//!
//! let found = set.matches(&Filter::parse("(class=Foo)")?);
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].id(), "a");
//! # Ok::<(), dsrpc::filter::FilterError>(())
//! ```

use crate::filter::Filter;
use crate::properties::{AttributeSource, PropertyValue};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Attributes indexed by [`CapabilitySet::default`].
pub const DEFAULT_INDEXED_ATTRIBUTES: [&str; 3] =
    ["service.interfaces", "endpoint.id", "endpoint.process.uuid"];

/// An attribute bag with a stable identity.
pub trait Capability: AttributeSource + Send + Sync {
    /// Unique id of this bag within a set.
    fn id(&self) -> &str;
}

#[derive(Default)]
struct AttributeIndex {
    by_value: HashMap<String, BTreeSet<String>>,
    /// Ids whose value is not a string, which equality may still match.
    unindexed: BTreeSet<String>,
}

struct Inner<C> {
    entries: BTreeMap<String, Arc<C>>,
    /// Keyed by lowercase attribute name.
    index: HashMap<String, AttributeIndex>,
}

/// A thread-safe set of capabilities with an inverted index.
pub struct CapabilitySet<C> {
    inner: RwLock<Inner<C>>,
}

impl<C: Capability> CapabilitySet<C> {
    /// Creates an empty set indexing `indexed_attributes`.
    pub fn new<I, S>(indexed_attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = indexed_attributes
            .into_iter()
            .map(|a| (a.as_ref().to_lowercase(), AttributeIndex::default()))
            .collect();
        Self {
            inner: RwLock::new(Inner {
                entries: BTreeMap::new(),
                index,
            }),
        }
    }

    /// Adds `capability`, replacing any entry with the same id.
    pub fn add_capability(&self, capability: C) -> Arc<C> {
        let capability = Arc::new(capability);
        let id = capability.id().to_string();
        let mut inner = self.inner.write();
        if let Some(previous) = inner.entries.remove(&id) {
            inner.unindex(&id, &*previous);
        }
        inner.reindex(&id, &*capability);
        inner.entries.insert(id, capability.clone());
        capability
    }

    /// Removes the entry with `id`.
    pub fn remove_capability(&self, id: &str) -> Option<Arc<C>> {
        let mut inner = self.inner.write();
        let removed = inner.entries.remove(id)?;
        inner.unindex(id, &*removed);
        Some(removed)
    }

    /// Returns the entry with `id`.
    pub fn get(&self, id: &str) -> Option<Arc<C>> {
        self.inner.read().entries.get(id).cloned()
    }

    /// Returns every entry matching `filter`, ordered by id.
    pub fn matches(&self, filter: &Filter) -> Vec<Arc<C>> {
        let inner = self.inner.read();
        match inner.candidates(filter) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.entries.get(id))
                .filter(|c| filter.matches(&***c))
                .cloned()
                .collect(),
            None => inner
                .entries
                .values()
                .filter(|c| filter.matches(&***c))
                .cloned()
                .collect(),
        }
    }

    /// Returns every entry, ordered by id.
    pub fn all(&self) -> Vec<Arc<C>> {
        self.inner.read().entries.values().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl<C: Capability> Default for CapabilitySet<C> {
    fn default() -> Self {
        Self::new(DEFAULT_INDEXED_ATTRIBUTES)
    }
}

impl<C> Inner<C> {
    fn reindex(&mut self, id: &str, capability: &dyn AttributeSource) {
        for (attribute, index) in &mut self.index {
            let Some(value) = capability.attribute(attribute) else {
                continue;
            };
            let (strings, others) = split(value);
            for s in strings {
                index.by_value.entry(s.to_string()).or_default().insert(id.to_string());
            }
            if others {
                index.unindexed.insert(id.to_string());
            }
        }
    }

    fn unindex(&mut self, id: &str, capability: &dyn AttributeSource) {
        for (attribute, index) in &mut self.index {
            let Some(value) = capability.attribute(attribute) else {
                continue;
            };
            for s in split(value).0 {
                if let Some(ids) = index.by_value.get_mut(s) {
                    ids.remove(id);
                    if ids.is_empty() {
                        index.by_value.remove(s);
                    }
                }
            }
            index.unindexed.remove(id);
        }
    }

    /// Returns a superset of the ids matching `filter`, or `None` when the
    /// index cannot narrow it.
    fn candidates(&self, filter: &Filter) -> Option<BTreeSet<String>> {
        match filter {
            Filter::Equal { attribute, value } => {
                let index = self.index.get(&attribute.to_lowercase())?;
                let mut ids = index.by_value.get(value).cloned().unwrap_or_default();
                ids.extend(index.unindexed.iter().cloned());
                Some(ids)
            }
            Filter::And(filters) => filters
                .iter()
                .filter_map(|f| self.candidates(f))
                .min_by_key(BTreeSet::len),
            Filter::Or(filters) => {
                let mut union = BTreeSet::new();
                for f in filters {
                    union.extend(self.candidates(f)?);
                }
                Some(union)
            }
            _ => None,
        }
    }
}

/// Splits a value into its string parts and whether it has non-string parts.
fn split(value: &PropertyValue) -> (Vec<&str>, bool) {
    match value {
        PropertyValue::String(s) => (vec![s.as_str()], false),
        PropertyValue::Array(items) | PropertyValue::List(items) => {
            let strings: Vec<&str> = items.iter().filter_map(PropertyValue::as_str).collect();
            let others = strings.len() < items.len();
            (strings, others)
        }
        _ => (Vec::new(), true),
    }
}
