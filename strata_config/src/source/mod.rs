//! Property sources: the leaves of a configuration tree.
//!
//! A [`PropertySource`] exposes point lookup, key enumeration and a change
//! channel. Leaves in this module hold their own data; composites in
//! [`crate::LayeredConfig`] and [`crate::CompositeConfig`] implement the same
//! trait so trees nest.

mod access;
mod env;
mod map;
mod settable;
mod view;

pub use access::{ConfigExt, SourceLookup};
pub use env::{EnvOptions, EnvironmentSource};
pub use map::MapSource;
pub use settable::SettableSource;
pub use view::PrefixedView;

use crate::{ConfigListener, Subscription, Value};

/// A key/value mapping with a change-notification channel.
///
/// A source may be attached to at most one parent composite at a time.
pub trait PropertySource: Send + Sync {
    /// Returns the raw value bound to `key`.
    fn get_raw(&self, key: &str) -> Option<Value>;

    /// Returns `true` when `key` is bound.
    fn contains_key(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Every key this source binds, in ascending order.
    fn keys(&self) -> Vec<String>;

    /// Visits every binding.
    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value));

    /// Returns `true` when the source binds nothing.
    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Registers `listener` for change events.
    fn subscribe(&self, listener: ConfigListener) -> Subscription;

    /// Value used when a placeholder inside one of this source's values
    /// names `key`. Views override this to resolve against their parent.
    fn lookup_placeholder(&self, key: &str) -> Option<Value> {
        self.get_raw(key)
    }
}
