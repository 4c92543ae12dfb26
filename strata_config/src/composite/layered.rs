//! Priority-tiered composite.

use std::sync::Arc;

use super::engine::{CompositeCore, Placement, Slot};
use super::state::{CompositeState, ResolvedEntry};
use super::visitor::ConfigVisitor;
use crate::{ConfigListener, Layer, PropertySource, StrataResult, Subscription, Value};

/// Merges named children arranged in [`Layer`]s.
///
/// Lookups return the value from the highest-priority child that binds the
/// key. Children are ordered by layer priority, then by insertion order
/// inside the layer (reversed for reversed layers). Names are unique across
/// the whole composite.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use strata_config::{ConfigExt, Layer, LayeredConfig, MapSource, PropertySource};
///
/// let config = LayeredConfig::new("app");
/// config.add_source(
///     Layer::DEFAULTS,
///     "defaults",
///     Arc::new(MapSource::from_pairs([("port", json!(80)), ("host", json!("localhost"))])),
/// )?;
/// config.add_source(
///     Layer::OVERRIDE,
///     "ops",
///     Arc::new(MapSource::from_pairs([("port", json!(8080))])),
/// )?;
///
/// assert_eq!(config.get_i32("port")?, 8080);
/// assert_eq!(config.get_with_source("host").map(|e| e.source().to_owned()).as_deref(), Some("defaults"));
/// assert_eq!(config.source_names(), vec!["ops", "defaults"]);
/// # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
/// ```
#[derive(Debug)]
pub struct LayeredConfig {
    core: Arc<CompositeCore>,
}

impl LayeredConfig {
    /// Creates an empty composite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: CompositeCore::new(name.into()),
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Attaches `source` to `layer` under `name`, rebuilds and emits
    /// [`crate::ConfigEvent::Added`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::StrataError::DuplicateSource`] when any layer already
    /// holds a child called `name`; the composite is left untouched.
    pub fn add_source(
        &self,
        layer: Layer,
        name: impl Into<String>,
        source: Arc<dyn PropertySource>,
    ) -> StrataResult<()> {
        self.core
            .add(Slot::layer(layer), name.into(), source, Placement::Append)
    }

    /// Detaches the child `name` from `layer`, rebuilds and emits
    /// [`crate::ConfigEvent::Removed`]. Returns `None` without side effects
    /// when no such child exists.
    pub fn remove_source(&self, layer: Layer, name: &str) -> Option<Arc<dyn PropertySource>> {
        self.core.remove(Some(layer), name)
    }

    /// Atomically removes any child called `name` and attaches `source` in
    /// its place, emitting a single [`crate::ConfigEvent::Updated`]. Returns
    /// the replaced child.
    pub fn replace_source(
        &self,
        layer: Layer,
        name: impl Into<String>,
        source: Arc<dyn PropertySource>,
    ) -> Option<Arc<dyn PropertySource>> {
        self.core.replace(Slot::layer(layer), name.into(), source)
    }

    /// Winning value for `key` and the child that supplied it.
    #[must_use]
    pub fn get_with_source(&self, key: &str) -> Option<ResolvedEntry> {
        self.core.state().get(key).cloned()
    }

    /// Current merged snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<CompositeState> {
        self.core.state()
    }

    /// Child names in override order, winner first.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        self.core.source_names()
    }

    /// Visits every resolved key.
    pub fn accept_keys(&self, visitor: &mut dyn ConfigVisitor) {
        self.core.accept_keys(visitor);
    }

    /// Visits every child with its layer, winner first.
    pub fn accept_children(&self, visitor: &mut dyn ConfigVisitor) {
        self.core.accept_children(visitor);
    }
}

impl PropertySource for LayeredConfig {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.core.get_raw(key)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.core.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.core.keys()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        self.core.for_each_property(visit);
    }

    fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.core.subscribe(listener)
    }
}
