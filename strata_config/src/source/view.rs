//! Read-only view of a parent source under a key prefix.

use std::fmt;
use std::sync::Arc;

use super::PropertySource;
use crate::{ConfigEvent, ConfigListener, Listeners, Subscription, Value};

/// Exposes the keys of `parent` that start with `prefix.`, with the prefix
/// stripped.
///
/// Placeholders inside viewed values resolve against the parent, so
/// `db.url = ${db.host}` reads correctly through a `db` view. The view
/// forwards parent events to its own listeners and drops its parent
/// registration when the view itself is dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use strata_config::{ConfigExt, MapSource, PrefixedView, PropertySource};
///
/// let parent = Arc::new(MapSource::from_pairs([
///     ("db.host", json!("db.internal")),
///     ("db.url", json!("pg://${db.host}")),
///     ("port", json!(1)),
/// ]));
/// let db = PrefixedView::new(parent, "db");
/// assert_eq!(db.keys(), vec!["host", "url"]);
/// assert_eq!(db.get_string("url")?, "pg://db.internal");
/// # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
/// ```
pub struct PrefixedView {
    parent: Arc<dyn PropertySource>,
    prefix: String,
    listeners: Listeners<ConfigEvent>,
    _parent_subscription: Subscription,
}

impl PrefixedView {
    /// Creates a view of `parent` under `prefix`. A trailing `.` is added
    /// when missing.
    pub fn new(parent: Arc<dyn PropertySource>, prefix: impl Into<String>) -> Self {
        let mut scope: String = prefix.into();
        if !scope.is_empty() && !scope.ends_with('.') {
            scope.push('.');
        }
        let listeners = Listeners::new();
        let forward = listeners.clone();
        let parent_subscription =
            parent.subscribe(Arc::new(move |event: &ConfigEvent| forward.emit(event)));
        Self {
            parent,
            prefix: scope,
            listeners,
            _parent_subscription: parent_subscription,
        }
    }

    /// Prefix including its trailing separator.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn qualify(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl fmt::Debug for PrefixedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixedView")
            .field("prefix", &self.prefix)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl PropertySource for PrefixedView {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.parent.get_raw(&self.qualify(key))
    }

    fn contains_key(&self, key: &str) -> bool {
        self.parent.contains_key(&self.qualify(key))
    }

    fn keys(&self) -> Vec<String> {
        self.parent
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_owned))
            .collect()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        let prefix = self.prefix.as_str();
        self.parent.for_each_property(&mut |key, value| {
            if let Some(stripped) = key.strip_prefix(prefix) {
                visit(stripped, value);
            }
        });
    }

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn lookup_placeholder(&self, key: &str) -> Option<Value> {
        self.parent.lookup_placeholder(key)
    }
}
