//! Mutation engine shared by [`super::LayeredConfig`] and
//! [`super::CompositeConfig`].
//!
//! Mutations take the per-composite mutex, edit the ordered child list,
//! rebuild the merged [`CompositeState`] from scratch and publish it with a
//! single pointer swap. Readers only ever load the published snapshot, so
//! they never block on the mutex and never observe a half-built view.
//! Events go out after the mutex is released.

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::state::{ChildInfo, CompositeState};
use super::visitor::ConfigVisitor;
use crate::{
    ConfigEvent, ConfigListener, Layer, Listeners, PropertySource, StrataError, StrataResult,
    Subscription, Value,
};

/// Sort key: tier first, then position inside the tier. Lower wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    priority: u16,
    position: i64,
}

/// Where a new child lands inside its tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Placement {
    /// After existing children of the tier, or before them when the tier is
    /// reversed.
    Append,
    /// Ahead of every existing child of the tier.
    Front,
}

/// Tier a child is inserted into.
#[derive(Clone, Copy, Debug)]
pub(super) struct Slot {
    pub(super) layer: Option<Layer>,
    pub(super) priority: u16,
    pub(super) reversed: bool,
}

impl Slot {
    pub(super) const fn layer(layer: Layer) -> Self {
        Self {
            layer: Some(layer),
            priority: layer.priority(),
            reversed: layer.is_reversed(),
        }
    }

    pub(super) const fn flat() -> Self {
        Self {
            layer: None,
            priority: 0,
            reversed: false,
        }
    }

    fn matches(&self, layer: Option<Layer>) -> bool {
        self.layer == layer
    }
}

struct Child {
    key: OrderKey,
    slot: Slot,
    name: Arc<str>,
    source: Arc<dyn PropertySource>,
    _subscription: Subscription,
}

impl Child {
    fn info(&self) -> ChildInfo {
        ChildInfo {
            name: Arc::clone(&self.name),
            layer: self.slot.layer,
            source: Arc::clone(&self.source),
        }
    }
}

#[derive(Default)]
struct Children {
    entries: Vec<Child>,
    next_seq: i64,
    front_seq: i64,
}

impl Children {
    fn position_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|c| &*c.name == name)
    }

    fn next_key(&mut self, slot: Slot, placement: Placement) -> OrderKey {
        let position = match placement {
            Placement::Front => {
                self.front_seq -= 1;
                self.front_seq
            }
            Placement::Append => {
                self.next_seq += 1;
                if slot.reversed {
                    -self.next_seq
                } else {
                    self.next_seq
                }
            }
        };
        OrderKey {
            priority: slot.priority,
            position,
        }
    }

    fn insert(&mut self, child: Child) {
        let at = self.entries.partition_point(|c| c.key < child.key);
        self.entries.insert(at, child);
    }

    fn snapshot(&self) -> CompositeState {
        CompositeState::build(self.entries.iter().map(Child::info).collect())
    }
}

pub(super) struct CompositeCore {
    name: String,
    children: Mutex<Children>,
    state: ArcSwap<CompositeState>,
    listeners: Listeners<ConfigEvent>,
    this: Weak<CompositeCore>,
}

impl fmt::Debug for CompositeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        f.debug_struct("CompositeCore")
            .field("name", &self.name)
            .field("children", &state.children())
            .field("keys", &state.len())
            .finish_non_exhaustive()
    }
}

impl CompositeCore {
    pub(super) fn new(name: String) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name,
            children: Mutex::new(Children::default()),
            state: ArcSwap::from_pointee(CompositeState::default()),
            listeners: Listeners::new(),
            this: this.clone(),
        })
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn state(&self) -> Arc<CompositeState> {
        self.state.load_full()
    }

    /// Subscribes to `source` on behalf of the child `name` without keeping
    /// the composite alive.
    fn watch(&self, name: &Arc<str>, source: &Arc<dyn PropertySource>) -> Subscription {
        let composite = self.this.clone();
        let child = Arc::clone(name);
        source.subscribe(Arc::new(move |event: &ConfigEvent| {
            if let Some(core) = composite.upgrade() {
                core.on_child_event(&child, event);
            }
        }))
    }

    fn publish(&self, children: &Children) -> usize {
        let state = children.snapshot();
        let keys = state.len();
        self.state.store(Arc::new(state));
        keys
    }

    pub(super) fn add(
        &self,
        slot: Slot,
        name: String,
        source: Arc<dyn PropertySource>,
        placement: Placement,
    ) -> StrataResult<()> {
        let shared_name: Arc<str> = name.into();
        let keys = {
            let mut children = self.children.lock();
            if children.position_of(&shared_name).is_some() {
                return Err(Arc::new(StrataError::DuplicateSource {
                    name: shared_name.to_string(),
                }));
            }
            let key = children.next_key(slot, placement);
            let subscription = self.watch(&shared_name, &source);
            children.insert(Child {
                key,
                slot,
                name: Arc::clone(&shared_name),
                source,
                _subscription: subscription,
            });
            self.publish(&children)
        };
        debug!(
            composite = %self.name,
            source = %shared_name,
            layer = slot.layer.map_or("", |l| l.name()),
            keys,
            "source added"
        );
        self.listeners.emit(&ConfigEvent::Added {
            source: shared_name.to_string(),
        });
        Ok(())
    }

    pub(super) fn remove(
        &self,
        layer: Option<Layer>,
        name: &str,
    ) -> Option<Arc<dyn PropertySource>> {
        let (removed, keys) = {
            let mut children = self.children.lock();
            let index = children
                .position_of(name)
                .filter(|&i| children.entries.get(i).is_some_and(|c| c.slot.matches(layer)))?;
            let removed = children.entries.remove(index);
            let keys = self.publish(&children);
            (removed, keys)
        };
        debug!(composite = %self.name, source = name, keys, "source removed");
        let source = Arc::clone(&removed.source);
        drop(removed);
        self.listeners.emit(&ConfigEvent::Removed {
            source: name.to_owned(),
        });
        Some(source)
    }

    /// Swaps the child called `name` for `source` in one step.
    ///
    /// A child already registered under `name` in the same tier keeps its
    /// position; otherwise the new child is placed as a fresh insertion.
    pub(super) fn replace(
        &self,
        slot: Slot,
        name: String,
        source: Arc<dyn PropertySource>,
    ) -> Option<Arc<dyn PropertySource>> {
        let shared_name: Arc<str> = name.into();
        let (previous, keys) = {
            let mut children = self.children.lock();
            let previous = children
                .position_of(&shared_name)
                .map(|index| children.entries.remove(index));
            let key = match &previous {
                Some(old) if old.slot.matches(slot.layer) => old.key,
                _ => children.next_key(slot, Placement::Append),
            };
            let subscription = self.watch(&shared_name, &source);
            children.insert(Child {
                key,
                slot,
                name: Arc::clone(&shared_name),
                source,
                _subscription: subscription,
            });
            (previous, self.publish(&children))
        };
        debug!(composite = %self.name, source = %shared_name, keys, "source replaced");
        let replaced = previous.map(|old| Arc::clone(&old.source));
        self.listeners.emit(&ConfigEvent::Updated {
            source: Some(shared_name.to_string()),
        });
        replaced
    }

    fn on_child_event(&self, child: &str, event: &ConfigEvent) {
        if !event.is_change() {
            self.listeners.emit(event);
            return;
        }
        let keys = {
            let children = self.children.lock();
            if children.position_of(child).is_none() {
                return;
            }
            self.publish(&children)
        };
        trace!(composite = %self.name, source = child, keys, "rebuilt after child change");
        self.listeners.emit(&ConfigEvent::Updated {
            source: Some(child.to_owned()),
        });
    }

    pub(super) fn source_names(&self) -> Vec<String> {
        self.state
            .load()
            .children()
            .iter()
            .map(|c| c.name().to_owned())
            .collect()
    }

    pub(super) fn accept_keys(&self, visitor: &mut dyn ConfigVisitor) {
        let state = self.state.load_full();
        for (key, entry) in state.iter() {
            visitor.visit_key(key, entry);
        }
    }

    pub(super) fn accept_children(&self, visitor: &mut dyn ConfigVisitor) {
        let state = self.state.load_full();
        for child in state.children() {
            visitor.visit_child(child.layer(), child.name(), child.source().as_ref());
        }
    }
}

impl PropertySource for CompositeCore {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.state.load().get(key).map(|e| e.value().clone())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.state.load().contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.state.load().keys().map(str::to_owned).collect()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        let state = self.state.load_full();
        for (key, entry) in state.iter() {
            visit(key, entry.value());
        }
    }

    fn is_empty(&self) -> bool {
        self.state.load().is_empty()
    }

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}
