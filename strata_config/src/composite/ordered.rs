//! Single-tier composite ordered purely by position.

use std::sync::Arc;

use super::engine::{CompositeCore, Placement, Slot};
use super::state::{CompositeState, ResolvedEntry};
use super::visitor::ConfigVisitor;
use crate::{ConfigListener, PropertySource, StrataResult, Subscription, Value};

/// Ordered list of named children where the first child binding a key wins.
///
/// Used for cascade results and ad-hoc grouping. Shares its merge and
/// notification behaviour with [`crate::LayeredConfig`].
#[derive(Debug)]
pub struct CompositeConfig {
    core: Arc<CompositeCore>,
}

impl CompositeConfig {
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

    /// Appends `source` with the lowest precedence so far.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StrataError::DuplicateSource`] when `name` is taken.
    pub fn add_source(
        &self,
        name: impl Into<String>,
        source: Arc<dyn PropertySource>,
    ) -> StrataResult<()> {
        self.core
            .add(Slot::flat(), name.into(), source, Placement::Append)
    }

    /// Inserts `source` ahead of every existing child.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StrataError::DuplicateSource`] when `name` is taken.
    pub fn add_source_first(
        &self,
        name: impl Into<String>,
        source: Arc<dyn PropertySource>,
    ) -> StrataResult<()> {
        self.core
            .add(Slot::flat(), name.into(), source, Placement::Front)
    }

    /// Swaps the child `name` for `source`, keeping its position when it
    /// already exists. Emits one [`crate::ConfigEvent::Updated`].
    pub fn replace_source(
        &self,
        name: impl Into<String>,
        source: Arc<dyn PropertySource>,
    ) -> Option<Arc<dyn PropertySource>> {
        self.core.replace(Slot::flat(), name.into(), source)
    }

    /// Detaches the child `name`; a no-op when absent.
    pub fn remove_source(&self, name: &str) -> Option<Arc<dyn PropertySource>> {
        self.core.remove(None, name)
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

    /// Child names, winner first.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        self.core.source_names()
    }

    /// Visits every resolved key.
    pub fn accept_keys(&self, visitor: &mut dyn ConfigVisitor) {
        self.core.accept_keys(visitor);
    }

    /// Visits every child, winner first.
    pub fn accept_children(&self, visitor: &mut dyn ConfigVisitor) {
        self.core.accept_children(visitor);
    }
}

impl PropertySource for CompositeConfig {
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
