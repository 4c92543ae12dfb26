//! Mutable in-memory source for runtime overrides.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use super::PropertySource;
use crate::{ConfigEvent, ConfigListener, Listeners, Subscription, Value};

/// Thread-safe mutable source.
///
/// Each call that actually changes the data emits a single
/// [`ConfigEvent::Updated`] after the write lock is released; writes that
/// leave the data unchanged are silent.
#[derive(Debug, Default)]
pub struct SettableSource {
    values: RwLock<BTreeMap<String, Value>>,
    listeners: Listeners<ConfigEvent>,
}

impl SettableSource {
    /// An empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `value`.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Value>) {
        let name = key.into();
        let bound = value.into();
        let changed = {
            let mut values = self.values.write();
            if values.get(&name) == Some(&bound) {
                false
            } else {
                values.insert(name.clone(), bound);
                true
            }
        };
        if changed {
            debug!(key = %name, "runtime property set");
            self.notify();
        }
    }

    /// Binds every pair, emitting at most one event for the batch.
    pub fn set_properties<K, V, I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let changed = {
            let mut values = self.values.write();
            let mut changed = false;
            for (key, value) in pairs {
                let bound = value.into();
                let previous = values.insert(key.into(), bound.clone());
                changed |= previous.as_ref() != Some(&bound);
            }
            changed
        };
        if changed {
            self.notify();
        }
    }

    /// Unbinds `key`, returning its previous value.
    pub fn clear_property(&self, key: &str) -> Option<Value> {
        let previous = self.values.write().remove(key);
        if previous.is_some() {
            debug!(key, "runtime property cleared");
            self.notify();
        }
        previous
    }

    fn notify(&self) {
        self.listeners.emit(&ConfigEvent::Updated { source: None });
    }
}

impl PropertySource for SettableSource {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        let snapshot = self.values.read().clone();
        for (key, value) in &snapshot {
            visit(key, value);
        }
    }

    fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}
