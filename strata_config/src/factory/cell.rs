//! Shared cache slot behind every [`super::Property`] handle.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, trace, warn};

use super::Resolver;
use super::property::PropertyEvent;
use crate::{Callback, Listeners, StrataError, StrataResult, Subscription};

/// A value tagged with the factory version it was resolved at. `None`
/// means "never resolved".
struct Stamped<T> {
    version: Option<u64>,
    value: Option<T>,
}

impl<T> Stamped<T> {
    const fn empty() -> Self {
        Self {
            version: None,
            value: None,
        }
    }

    fn is_newer_than(&self, version: u64) -> bool {
        self.version.is_some_and(|seen| seen > version)
    }
}

pub(super) struct PropertyCell<T> {
    key: String,
    resolver: Arc<Resolver>,
    committed: RwLock<Stamped<T>>,
    // Last value pushed to observers. Reentrant so a listener may trigger a
    // nested refresh of the same cell.
    published: ReentrantMutex<RefCell<Stamped<T>>>,
    listeners: Listeners<PropertyEvent<T>>,
}

impl<T> PropertyCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(super) fn new(key: String, resolver: Arc<Resolver>) -> Self {
        Self {
            key,
            resolver,
            committed: RwLock::new(Stamped::empty()),
            published: ReentrantMutex::new(RefCell::new(Stamped::empty())),
            listeners: Listeners::new(),
        }
    }

    pub(super) fn key(&self) -> &str {
        &self.key
    }

    /// Current value, re-resolving first when the factory version moved.
    ///
    /// Concurrent stale readers may both re-resolve. A resolution started
    /// at an older version never replaces one committed at a newer version.
    pub(super) fn read(&self) -> StrataResult<Option<T>> {
        let version = self.resolver.version();
        {
            let committed = self.committed.read();
            if committed.version == Some(version) {
                return Ok(committed.value.clone());
            }
        }
        self.refresh(version)
    }

    /// Last successfully resolved value, refreshing when stale. Resolution
    /// failures leave it untouched.
    pub(super) fn read_last_good(&self) -> Option<T> {
        self.read()
            .unwrap_or_else(|_| self.committed.read().value.clone())
    }

    fn refresh(&self, version: u64) -> StrataResult<Option<T>> {
        trace!(key = %self.key, version, "re-resolving property");
        let resolved = self.resolver.resolve::<T>(&self.key);
        {
            let mut committed = self.committed.write();
            if committed.is_newer_than(version) {
                trace!(key = %self.key, version, "discarding superseded resolution");
                return Ok(committed.value.clone());
            }
            committed.version = Some(version);
            if let Ok(value) = &resolved {
                committed.value.clone_from(value);
            }
        }
        self.publish(version, &resolved);
        resolved
    }

    /// Pushes the outcome resolved at `version` unless a newer one was
    /// already pushed. Unchanged values are not pushed again.
    fn publish(&self, version: u64, outcome: &StrataResult<Option<T>>) {
        let guard = self.published.lock();
        let event = {
            let mut last = guard.borrow_mut();
            if last.is_newer_than(version) {
                return;
            }
            last.version = Some(version);
            match outcome {
                Ok(value) if *value == last.value => return,
                Ok(value) => {
                    last.value.clone_from(value);
                    PropertyEvent::Changed(value.clone())
                }
                Err(err) => PropertyEvent::Error(Arc::clone(err)),
            }
        };
        self.listeners.emit(&event);
    }

    /// Pushes a refresh to observers after a version bump.
    pub(super) fn refresh_observed(&self) {
        if !self.listeners.is_empty()
            && let Err(err) = self.read()
        {
            log_failure(&self.key, &err, "property refresh failed");
        }
    }

    pub(super) fn subscribe(&self, listener: Callback<PropertyEvent<T>>) -> Subscription {
        if let Err(err) = self.read() {
            log_failure(&self.key, &err, "property unresolved at subscription");
        }
        self.listeners.subscribe(listener)
    }
}

fn log_failure(key: &str, err: &StrataError, message: &'static str) {
    if err.is_misconfiguration() {
        warn!(key, error = %err, "{message}");
    } else {
        debug!(key, error = %err, "{message}");
    }
}
