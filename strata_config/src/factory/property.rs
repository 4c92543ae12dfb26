//! Typed property handles.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::PropertyFactory;
use super::cell::PropertyCell;
use crate::{Callback, StrataError, StrataResult, Subscription};

/// Notification delivered to property observers.
#[derive(Clone, Debug)]
pub enum PropertyEvent<T> {
    /// The resolved value changed; `None` means the key became unbound.
    Changed(Option<T>),
    /// Re-resolution failed; the last good value is retained.
    Error(Arc<StrataError>),
}

/// Callback receiving [`PropertyEvent`]s.
pub type PropertyListener<T> = Callback<PropertyEvent<T>>;

/// Live, typed view of one key.
///
/// Reads compare the handle's last observed factory version with the current
/// one and re-resolve only when it moved. Handles for the same key and type
/// share a single cache entry; only the default differs.
pub struct Property<T> {
    cell: Arc<PropertyCell<T>>,
    default: T,
}

impl<T> Clone for Property<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            default: self.default.clone(),
        }
    }
}

impl<T> fmt::Debug for Property<T>
where
    T: Clone + PartialEq + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("key", &self.cell.key())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl<T> Property<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Key this handle reads.
    #[must_use]
    pub fn key(&self) -> &str {
        self.cell.key()
    }

    /// Resolved value, or `None` when unbound. After a failed re-resolution
    /// the last good value is returned.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.cell.read_last_good()
    }

    /// Resolved value, falling back to the handle's default.
    #[must_use]
    pub fn value(&self) -> T {
        self.get().unwrap_or_else(|| self.default.clone())
    }

    /// Resolved value, surfacing resolution failures.
    ///
    /// # Errors
    ///
    /// Interpolation or decode failures from a re-resolution.
    pub fn try_get(&self) -> StrataResult<Option<T>> {
        self.cell.read()
    }

    /// Registers an observer. The value is resolved first, so the observer
    /// is told about later changes only.
    pub fn subscribe(&self, listener: PropertyListener<T>) -> Subscription {
        self.cell.subscribe(listener)
    }
}

/// Untyped request returned by [`PropertyFactory::property`].
#[derive(Debug)]
#[must_use = "choose a type with one of the `as_*` methods"]
pub struct PropertyRef<'a> {
    factory: &'a PropertyFactory,
    key: String,
}

impl<'a> PropertyRef<'a> {
    pub(super) const fn new(factory: &'a PropertyFactory, key: String) -> Self {
        Self { factory, key }
    }

    fn typed<T>(self, default: T) -> Property<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Property {
            cell: self.factory.cell::<T>(&self.key),
            default,
        }
    }

    /// String view.
    pub fn as_string(self, default: impl Into<String>) -> Property<String> {
        self.typed(default.into())
    }

    /// Boolean view accepting `true/yes/on` and `false/no/off`.
    pub fn as_bool(self, default: bool) -> Property<bool> {
        self.typed(default)
    }

    /// 32-bit signed view.
    pub fn as_i32(self, default: i32) -> Property<i32> {
        self.typed(default)
    }

    /// 64-bit signed view.
    pub fn as_i64(self, default: i64) -> Property<i64> {
        self.typed(default)
    }

    /// 64-bit unsigned view.
    pub fn as_u64(self, default: u64) -> Property<u64> {
        self.typed(default)
    }

    /// Floating-point view.
    pub fn as_f64(self, default: f64) -> Property<f64> {
        self.typed(default)
    }

    /// Millisecond duration view.
    pub fn as_duration(self, default: Duration) -> Property<Duration> {
        self.typed(default)
    }

    /// Comma-separated list view.
    pub fn as_list(self, default: Vec<String>) -> Property<Vec<String>> {
        self.typed(default)
    }

    /// View decoded by the factory's registry.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownType`] when `T` has no registered
    /// decoder.
    pub fn as_type<T>(self, default: T) -> StrataResult<Property<T>>
    where
        T: Any + Clone + PartialEq + Send + Sync,
    {
        self.factory.decoders().ensure_supported::<T>()?;
        Ok(self.typed(default))
    }
}
