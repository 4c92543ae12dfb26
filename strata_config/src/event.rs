//! Change notification plumbing shared by sources, composites and properties.
//!
//! A [`Listeners`] registry owns its callbacks. Emission clones the current
//! callback list before invoking anything, so a callback may subscribe or
//! unsubscribe (including itself) without deadlocking or disturbing the
//! delivery in progress. Registrations are released deterministically by
//! dropping the [`Subscription`] returned from [`Listeners::subscribe`].

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::StrataError;

/// Change signalled by a property source or composite.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum ConfigEvent {
    /// A child source was attached to a composite.
    Added {
        /// Name the child was registered under.
        source: String,
    },
    /// A child source was detached from a composite.
    Removed {
        /// Name the child was registered under.
        source: String,
    },
    /// Values changed. Leaf sources report `None`; composites report the
    /// child that changed or was replaced.
    Updated {
        /// Child responsible for the change, when known.
        source: Option<String>,
    },
    /// A source failed to refresh and kept its previous values.
    Error(Arc<StrataError>),
}

impl ConfigEvent {
    /// Returns `true` for events that may have changed resolved values.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Error(_))
    }
}

/// Shared callback type stored by [`Listeners`].
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Callback receiving [`ConfigEvent`]s.
pub type ConfigListener = Callback<ConfigEvent>;

struct Registry<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

/// Ordered registry of callbacks for events of type `E`.
pub struct Listeners<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

impl<E: 'static> Listeners<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`; it stays registered while the returned
    /// [`Subscription`] is alive.
    pub fn subscribe(&self, callback: Callback<E>) -> Subscription {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, callback));
            id
        };
        let registry: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Delivers `event` to every callback in registration order.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .registry
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> Listeners<E> {
    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle keeping a listener registered.
///
/// Dropping the handle, or calling [`Subscription::unsubscribe`], removes the
/// registration. Use [`Subscription::detach`] to keep the listener for the
/// lifetime of the registry instead.
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that owns no registration.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Removes the registration now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keeps the registration alive until its registry is dropped.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_in_registration_order() {
        let listeners = Listeners::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let seen = Arc::clone(&seen);
            listeners.subscribe(Arc::new(move |e: &u32| seen.lock().push(("first", *e))))
        };
        let second = {
            let seen = Arc::clone(&seen);
            listeners.subscribe(Arc::new(move |e: &u32| seen.lock().push(("second", *e))))
        };
        listeners.emit(&7);
        assert_eq!(*seen.lock(), vec![("first", 7), ("second", 7)]);
        drop((first, second));
        assert!(listeners.is_empty());
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let listeners = Listeners::<()>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let subscription = {
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            listeners.subscribe(Arc::new(move |_: &()| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(own) = slot.lock().take() {
                    own.unsubscribe();
                }
            }))
        };
        *slot.lock() = Some(subscription);
        listeners.emit(&());
        listeners.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn detached_subscription_survives_handle() {
        let listeners = Listeners::<()>::new();
        listeners.subscribe(Arc::new(|_: &()| {})).detach();
        assert_eq!(listeners.len(), 1);
    }
}
