//! Process environment snapshot.

use std::collections::BTreeMap;

use figment::providers::Env;
use parking_lot::RwLock;
use tracing::debug;

use super::PropertySource;
use crate::{ConfigEvent, ConfigListener, Listeners, Subscription, Value};

/// How environment variables map onto property keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvOptions {
    prefix: Option<String>,
    split: Option<String>,
    lowercase_keys: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            split: None,
            lowercase_keys: true,
        }
    }
}

impl EnvOptions {
    /// Options capturing every variable with lower-cased keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only variables starting with `prefix` (case-insensitive) and
    /// strips it from the key.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Turns every occurrence of `pattern` in a key into a `.` separator,
    /// so `DB__HOST` with `"__"` becomes `db.host`.
    #[must_use]
    pub fn split(mut self, pattern: impl Into<String>) -> Self {
        self.split = Some(pattern.into());
        self
    }

    /// Whether keys are lower-cased. Enabled by default.
    #[must_use]
    pub const fn lowercase_keys(mut self, lowercase: bool) -> Self {
        self.lowercase_keys = lowercase;
        self
    }

    fn provider(&self) -> Env {
        let base = self
            .prefix
            .as_deref()
            .map_or_else(Env::raw, Env::prefixed);
        let nested = match self.split.as_deref() {
            Some(pattern) => base.split(pattern),
            None => base,
        };
        nested.lowercase(self.lowercase_keys)
    }

    fn read(&self) -> BTreeMap<String, Value> {
        self.provider()
            .iter()
            .map(|(key, value)| (key.as_str().to_owned(), Value::String(value)))
            .collect()
    }

    /// Captures the environment with these options.
    #[must_use]
    pub fn capture(self) -> EnvironmentSource {
        let values = self.read();
        debug!(
            keys = values.len(),
            prefix = self.prefix.as_deref().unwrap_or(""),
            "captured environment"
        );
        EnvironmentSource {
            options: self,
            values: RwLock::new(values),
            listeners: Listeners::new(),
        }
    }
}

/// Point-in-time copy of environment variables.
///
/// The snapshot never tracks the live environment; call
/// [`EnvironmentSource::refresh`] to re-read it.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata_config::{EnvOptions, PropertySource};
///
/// let _host = test_helpers::env::set_var("STRATA_DOC_DB__HOST", "db.internal");
/// let source = EnvOptions::new().prefix("STRATA_DOC_").split("__").capture();
/// assert_eq!(source.keys(), vec!["db.host"]);
/// assert_eq!(source.get_raw("db.host"), Some(json!("db.internal")));
/// ```
#[derive(Debug)]
pub struct EnvironmentSource {
    options: EnvOptions,
    values: RwLock<BTreeMap<String, Value>>,
    listeners: Listeners<ConfigEvent>,
}

impl EnvironmentSource {
    /// Captures every variable with default [`EnvOptions`].
    #[must_use]
    pub fn capture() -> Self {
        EnvOptions::default().capture()
    }

    /// Captures variables starting with `prefix`, stripping it from keys.
    #[must_use]
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        EnvOptions::new().prefix(prefix).capture()
    }

    /// Options used for capture.
    #[must_use]
    pub const fn options(&self) -> &EnvOptions {
        &self.options
    }

    /// Re-reads the environment, emitting [`ConfigEvent::Updated`] when the
    /// snapshot changed. Returns whether it did.
    pub fn refresh(&self) -> bool {
        let fresh = self.options.read();
        let changed = {
            let mut values = self.values.write();
            if *values == fresh {
                false
            } else {
                *values = fresh;
                true
            }
        };
        if changed {
            debug!("environment snapshot refreshed");
            self.listeners.emit(&ConfigEvent::Updated { source: None });
        }
        changed
    }
}

impl PropertySource for EnvironmentSource {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
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

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}
