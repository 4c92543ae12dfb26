//! Cached, typed, live property handles.
//!
//! A [`PropertyFactory`] watches a root source and keeps a single global
//! version counter. Every `Added`, `Removed` or `Updated` event from the
//! root bumps the counter exactly once; error events do not. Property
//! handles remember the version they last resolved at and re-resolve
//! (lookup, interpolate, decode) only when it moved. After each bump the
//! factory also refreshes every property that has observers, so they are
//! pushed new values without anyone reading.
//!
//! ```
//! use std::sync::Arc;
//! use strata_config::{Layer, LayeredConfig, PropertyFactory, SettableSource};
//!
//! let config = Arc::new(LayeredConfig::new("app"));
//! let runtime = Arc::new(SettableSource::new());
//! config.add_source(Layer::RUNTIME, "runtime", runtime.clone())?;
//!
//! let factory = PropertyFactory::new(config);
//! let port = factory.property("port").as_i32(80);
//! assert_eq!(port.value(), 80);
//!
//! runtime.set_property("port", "8080");
//! assert_eq!(port.value(), 8080);
//! # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
//! ```

mod cell;
mod property;

pub use property::{Property, PropertyEvent, PropertyListener, PropertyRef};

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use self::cell::PropertyCell;
use crate::decode::DecoderRegistry;
use crate::interpolate::{Interpolator, StrInterpolator};
use crate::{ConfigEvent, PropertySource, SourceLookup, StrataResult, Subscription, to_raw_string};

/// Everything a cell needs to resolve itself. Owns no cells.
pub(crate) struct Resolver {
    root: Arc<dyn PropertySource>,
    interpolator: Arc<dyn Interpolator>,
    decoders: DecoderRegistry,
    version: AtomicU64,
}

impl Resolver {
    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn resolve<T: Any>(&self, key: &str) -> StrataResult<Option<T>> {
        let Some(raw) = self.root.get_raw(key) else {
            return Ok(None);
        };
        let text = self
            .interpolator
            .resolve(&to_raw_string(&raw), &SourceLookup::new(self.root.as_ref()))?;
        self.decoders.decode::<T>(key, &text).map(Some)
    }
}

struct CellSlot {
    cell: Arc<dyn Any + Send + Sync>,
    refresh: Arc<dyn Fn() + Send + Sync>,
}

struct FactoryInner {
    resolver: Arc<Resolver>,
    cells: Mutex<HashMap<(String, TypeId), CellSlot>>,
    _root_subscription: Subscription,
}

impl FactoryInner {
    fn on_root_event(&self, event: &ConfigEvent) {
        if !event.is_change() {
            return;
        }
        let version = self.resolver.version.fetch_add(1, Ordering::AcqRel) + 1;
        let observed: Vec<Arc<dyn Fn() + Send + Sync>> = self
            .cells
            .lock()
            .values()
            .map(|slot| Arc::clone(&slot.refresh))
            .collect();
        debug!(version, cells = observed.len(), "configuration version bumped");
        for refresh in observed {
            refresh();
        }
    }
}

/// Issues cached typed handles over a root source.
#[derive(Clone)]
pub struct PropertyFactory {
    inner: Arc<FactoryInner>,
}

impl fmt::Debug for PropertyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyFactory")
            .field("version", &self.version())
            .field("cached", &self.cached_properties())
            .field("decoders", &self.inner.resolver.decoders)
            .finish_non_exhaustive()
    }
}

impl PropertyFactory {
    /// Factory with the default decoders and a strict interpolator.
    pub fn new(root: Arc<dyn PropertySource>) -> Self {
        Self::assemble(
            root,
            Arc::new(StrInterpolator::default()),
            DecoderRegistry::default(),
        )
    }

    fn assemble(
        root: Arc<dyn PropertySource>,
        interpolator: Arc<dyn Interpolator>,
        decoders: DecoderRegistry,
    ) -> Self {
        let inner = Arc::new_cyclic(|this: &Weak<FactoryInner>| {
            let weak = this.clone();
            let subscription = root.subscribe(Arc::new(move |event: &ConfigEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_root_event(event);
                }
            }));
            FactoryInner {
                resolver: Arc::new(Resolver {
                    root: Arc::clone(&root),
                    interpolator,
                    decoders,
                    version: AtomicU64::new(0),
                }),
                cells: Mutex::new(HashMap::new()),
                _root_subscription: subscription,
            }
        });
        Self { inner }
    }

    /// Rebuilds the factory with `decoders`. Handles issued earlier keep
    /// using the previous registry.
    #[must_use]
    pub fn with_decoders(self, decoders: DecoderRegistry) -> Self {
        let resolver = &self.inner.resolver;
        Self::assemble(
            Arc::clone(&resolver.root),
            Arc::clone(&resolver.interpolator),
            decoders,
        )
    }

    /// Rebuilds the factory with `interpolator`. Handles issued earlier keep
    /// using the previous one.
    #[must_use]
    pub fn with_interpolator(self, interpolator: impl Interpolator + 'static) -> Self {
        let resolver = &self.inner.resolver;
        Self::assemble(
            Arc::clone(&resolver.root),
            Arc::new(interpolator),
            resolver.decoders.clone(),
        )
    }

    /// Starts a typed request for `key`.
    pub fn property(&self, key: impl Into<String>) -> PropertyRef<'_> {
        PropertyRef::new(self, key.into())
    }

    /// Current global version; bumped once per root change event.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.resolver.version()
    }

    /// Number of cached `(key, type)` entries.
    #[must_use]
    pub fn cached_properties(&self) -> usize {
        self.inner.cells.lock().len()
    }

    /// Source properties resolve against.
    #[must_use]
    pub fn root(&self) -> &Arc<dyn PropertySource> {
        &self.inner.resolver.root
    }

    fn decoders(&self) -> &DecoderRegistry {
        &self.inner.resolver.decoders
    }

    fn cell<T>(&self, key: &str) -> Arc<PropertyCell<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let mut cells = self.inner.cells.lock();
        let slot = cells
            .entry((key.to_owned(), TypeId::of::<T>()))
            .or_insert_with(|| {
                let cell = Arc::new(PropertyCell::<T>::new(
                    key.to_owned(),
                    Arc::clone(&self.inner.resolver),
                ));
                let observed = Arc::clone(&cell);
                CellSlot {
                    cell,
                    refresh: Arc::new(move || observed.refresh_observed()),
                }
            });
        Arc::clone(&slot.cell)
            .downcast::<PropertyCell<T>>()
            .unwrap_or_else(|_| {
                Arc::new(PropertyCell::new(
                    key.to_owned(),
                    Arc::clone(&self.inner.resolver),
                ))
            })
    }
}

#[cfg(test)]
mod tests;
