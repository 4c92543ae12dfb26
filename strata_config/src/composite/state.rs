//! Immutable merged snapshot published by composites.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{Layer, PropertySource, Value};

/// Winning value for a key together with the child that supplied it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEntry {
    value: Value,
    source: Arc<str>,
}

impl ResolvedEntry {
    pub(crate) const fn new(value: Value, source: Arc<str>) -> Self {
        Self { value, source }
    }

    /// Raw winning value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Name of the child source that supplied the value.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A child as recorded in a snapshot.
#[derive(Clone)]
pub struct ChildInfo {
    pub(crate) name: Arc<str>,
    pub(crate) layer: Option<Layer>,
    pub(crate) source: Arc<dyn PropertySource>,
}

impl ChildInfo {
    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer the child sits in; `None` inside a [`crate::CompositeConfig`].
    #[must_use]
    pub const fn layer(&self) -> Option<Layer> {
        self.layer
    }

    /// The child itself.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn PropertySource> {
        &self.source
    }
}

impl fmt::Debug for ChildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildInfo")
            .field("name", &self.name)
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

/// Flattened `key → (value, owning source)` view of a composite.
///
/// Built by folding children in override order with first-wins insertion
/// and never modified afterwards; composites replace the whole snapshot on
/// every change.
#[derive(Clone, Debug, Default)]
pub struct CompositeState {
    entries: BTreeMap<String, ResolvedEntry>,
    children: Vec<ChildInfo>,
}

impl CompositeState {
    pub(crate) fn build(children: Vec<ChildInfo>) -> Self {
        let mut entries: BTreeMap<String, ResolvedEntry> = BTreeMap::new();
        for child in &children {
            child.source.for_each_property(&mut |key, value| {
                if !entries.contains_key(key) {
                    entries.insert(
                        key.to_owned(),
                        ResolvedEntry::new(value.clone(), Arc::clone(&child.name)),
                    );
                }
            });
        }
        Self { entries, children }
    }

    /// Winning entry for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResolvedEntry> {
        self.entries.get(key)
    }

    /// Returns `true` when some child binds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Resolved keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolved entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Number of resolved keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no key is resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Children in override order, winner first.
    #[must_use]
    pub fn children(&self) -> &[ChildInfo] {
        &self.children
    }
}
