//! Output of a cascade load.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{CompositeConfig, MapSource, StrataError, StrataResult};

/// Loaded variants in load order: the overrides entry (if any), then the
/// base name, then each more specific variant. Variants that failed to load
/// are left out and their errors kept.
#[derive(Clone, Debug, Default)]
pub struct CascadeResult {
    entries: IndexMap<String, Arc<MapSource>>,
    overrides: Option<String>,
    skipped: Vec<Arc<StrataError>>,
}

impl CascadeResult {
    pub(super) fn insert_overrides(&mut self, name: String, source: MapSource) {
        self.entries.insert(name.clone(), Arc::new(source));
        self.overrides = Some(name);
    }

    pub(super) fn insert(&mut self, name: String, source: MapSource) {
        self.entries.insert(name, Arc::new(source));
    }

    pub(super) fn skip(&mut self, err: Arc<StrataError>) {
        self.skipped.push(err);
    }

    /// Errors of variants that were skipped, in cascade order.
    #[must_use]
    pub fn skipped(&self) -> &[Arc<StrataError>] {
        &self.skipped
    }

    /// Skipped-variant errors folded into one, or `None` when every variant
    /// a reader claimed loaded cleanly.
    #[must_use]
    pub fn skipped_error(&self) -> Option<Arc<StrataError>> {
        StrataError::aggregate(self.skipped.iter().cloned())
    }

    /// Loaded names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Source loaded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<MapSource>> {
        self.entries.get(name)
    }

    /// Number of loaded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a composite in which the overrides entry wins, then the most
    /// specific variant, down to the base name.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::StrataError::DuplicateSource`]; entry names are
    /// unique, so this does not happen in practice.
    pub fn into_composite(self, name: impl Into<String>) -> StrataResult<CompositeConfig> {
        let composite = CompositeConfig::new(name);
        let Self {
            entries, overrides, ..
        } = self;
        let mut variants: Vec<(String, Arc<MapSource>)> = Vec::with_capacity(entries.len());
        for (entry_name, source) in entries {
            if overrides.as_deref() == Some(entry_name.as_str()) {
                composite.add_source(entry_name, source)?;
            } else {
                variants.push((entry_name, source));
            }
        }
        for (entry_name, source) in variants.into_iter().rev() {
            composite.add_source(entry_name, source)?;
        }
        Ok(composite)
    }
}
