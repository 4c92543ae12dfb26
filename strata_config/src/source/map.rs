//! Immutable in-memory source.

use std::collections::BTreeMap;

use super::PropertySource;
use crate::{ConfigListener, Subscription, Value};

/// Fixed key/value mapping. Never emits change events.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata_config::{MapSource, PropertySource};
///
/// let source = MapSource::from_pairs([("port", json!(8080))]);
/// assert_eq!(source.get_raw("port"), Some(json!(8080)));
/// assert_eq!(source.keys(), vec!["port".to_owned()]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapSource {
    values: BTreeMap<String, Value>,
}

impl MapSource {
    /// An empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing map.
    #[must_use]
    pub const fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Builds a source from `(key, value)` pairs; later pairs win.
    #[must_use]
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Borrows the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl PropertySource for MapSource {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        for (key, value) in &self.values {
            visit(key, value);
        }
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn subscribe(&self, _listener: ConfigListener) -> Subscription {
        Subscription::inert()
    }
}
