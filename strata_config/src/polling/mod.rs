//! Dynamic source fed by periodically fetched snapshots.
//!
//! A [`PollingSource`] wraps a [`SnapshotReader`]. Each [`PollingSource::poll`]
//! fetches a full snapshot and swaps it in wholesale; there is no key-level
//! diffing. At most one fetch runs at a time: a poll triggered while another
//! is in flight returns [`PollOutcome::Skipped`] immediately instead of
//! queueing. A failed fetch leaves the previous snapshot untouched and is
//! reported only through a [`crate::ConfigEvent::Error`] event, during which
//! the source reports [`PollState::Error`].
//!
//! Polls are driven externally, either by calling `poll` directly or by a
//! [`FixedPollingStrategy`] thread.

mod strategy;

pub use strategy::{FixedPollingStrategy, PollerHandle};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::{
    ConfigEvent, ConfigListener, Listeners, PropertySource, StrataError, StrataResult,
    Subscription, Value,
};

/// Result of one fetch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PollingSnapshot {
    values: BTreeMap<String, Value>,
    ids: BTreeMap<String, String>,
    has_data: bool,
}

impl PollingSnapshot {
    /// Snapshot replacing every value with `values`.
    #[must_use]
    pub const fn new(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
            ids: BTreeMap::new(),
            has_data: true,
        }
    }

    /// Attaches per-key instrumentation identifiers.
    #[must_use]
    pub fn with_ids(mut self, ids: BTreeMap<String, String>) -> Self {
        self.ids = ids;
        self
    }

    /// A response carrying no data: the current snapshot is kept and no event
    /// is emitted.
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Whether this snapshot should replace the current one.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.has_data
    }

    /// Values carried by the snapshot.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

/// Produces snapshots on demand.
pub trait SnapshotReader: Send + Sync {
    /// Fetches the current snapshot.
    ///
    /// # Errors
    ///
    /// Any failure; the caller keeps serving the previous snapshot.
    fn fetch(&self) -> StrataResult<PollingSnapshot>;
}

impl<F> SnapshotReader for F
where
    F: Fn() -> StrataResult<PollingSnapshot> + Send + Sync,
{
    fn fetch(&self) -> StrataResult<PollingSnapshot> {
        self()
    }
}

/// What a call to [`PollingSource::poll`] did.
#[derive(Clone, Debug)]
pub enum PollOutcome {
    /// Another fetch was already in flight.
    Skipped,
    /// The fetch returned [`PollingSnapshot::unchanged`].
    Unchanged,
    /// A new snapshot was published.
    Updated,
    /// The fetch failed; the previous snapshot remains.
    Failed(Arc<StrataError>),
}

/// Fetch lifecycle of a [`PollingSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PollState {
    /// No fetch in flight.
    Idle = 0,
    /// A fetch is in flight.
    Fetching = 1,
    /// The last fetch failed and its error is being reported. Reverts to
    /// `Idle` once listeners have run.
    Error = 2,
}

impl PollState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Fetching,
            2 => Self::Error,
            _ => Self::Idle,
        }
    }
}

/// Holds the `Fetching` state; dropping it settles the state, even if the
/// reader panics.
struct InFlight<'a> {
    state: &'a AtomicU8,
    settle: PollState,
}

impl<'a> InFlight<'a> {
    /// Enters `Fetching` from `Idle` or `Error`; `None` while another fetch
    /// runs.
    fn acquire(state: &'a AtomicU8) -> Option<Self> {
        state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (PollState::from_raw(raw) != PollState::Fetching)
                    .then_some(PollState::Fetching as u8)
            })
            .ok()
            .map(|_| Self {
                state,
                settle: PollState::Idle,
            })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.store(self.settle as u8, Ordering::Release);
    }
}

/// Property source backed by a polled [`SnapshotReader`].
pub struct PollingSource {
    reader: Box<dyn SnapshotReader>,
    snapshot: ArcSwap<PollingSnapshot>,
    state: AtomicU8,
    updates: AtomicU64,
    errors: AtomicU64,
    last_update_ms: AtomicU64,
    listeners: Listeners<ConfigEvent>,
}

impl fmt::Debug for PollingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingSource")
            .field("state", &self.state())
            .field("keys", &self.snapshot.load().values.len())
            .field("updates", &self.update_count())
            .field("errors", &self.error_count())
            .finish_non_exhaustive()
    }
}

impl PollingSource {
    /// Creates an empty source; nothing is fetched until the first poll.
    pub fn new(reader: impl SnapshotReader + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            snapshot: ArcSwap::from_pointee(PollingSnapshot::default()),
            state: AtomicU8::new(PollState::Idle as u8),
            updates: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_update_ms: AtomicU64::new(0),
            listeners: Listeners::new(),
        }
    }

    /// Creates a source around a fetch closure.
    pub fn from_fn<F>(fetch: F) -> Self
    where
        F: Fn() -> StrataResult<PollingSnapshot> + Send + Sync + 'static,
    {
        Self::new(fetch)
    }

    /// Fetches once unless a fetch is already running.
    pub fn poll(&self) -> PollOutcome {
        let Some(mut guard) = InFlight::acquire(&self.state) else {
            debug!("poll skipped: fetch already in flight");
            return PollOutcome::Skipped;
        };
        let outcome = match self.reader.fetch() {
            Ok(snapshot) if !snapshot.has_data() => PollOutcome::Unchanged,
            Ok(snapshot) => {
                let keys = snapshot.values.len();
                self.snapshot.store(Arc::new(snapshot));
                self.updates.fetch_add(1, Ordering::Relaxed);
                self.last_update_ms.store(now_millis(), Ordering::Relaxed);
                debug!(keys, "polled snapshot published");
                PollOutcome::Updated
            }
            Err(err) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "poll failed; keeping previous snapshot");
                guard.settle = PollState::Error;
                PollOutcome::Failed(err)
            }
        };
        // Listeners may poll again, so `Fetching` is left first.
        drop(guard);

        match &outcome {
            PollOutcome::Updated => self.listeners.emit(&ConfigEvent::Updated { source: None }),
            PollOutcome::Failed(err) => {
                self.listeners.emit(&ConfigEvent::Error(Arc::clone(err)));
                // A listener may already have started another fetch.
                let _settled = self.state.compare_exchange(
                    PollState::Error as u8,
                    PollState::Idle as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
            PollOutcome::Skipped | PollOutcome::Unchanged => {}
        }
        outcome
    }

    /// Current fetch lifecycle state.
    #[must_use]
    pub fn state(&self) -> PollState {
        PollState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Number of snapshots published so far.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Number of failed fetches so far.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Wall-clock milliseconds since the Unix epoch of the last published
    /// snapshot, or `None` before the first one.
    #[must_use]
    pub fn last_update(&self) -> Option<u64> {
        Some(self.last_update_ms.load(Ordering::Relaxed)).filter(|&ms| ms != 0)
    }

    /// Instrumentation identifier attached to `key` by the last snapshot.
    #[must_use]
    pub fn instrumentation_id(&self, key: &str) -> Option<String> {
        self.snapshot.load().ids.get(key).cloned()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| u64::try_from(elapsed.as_millis()).ok())
        .map_or(1, |ms| ms.max(1))
}

impl PropertySource for PollingSource {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.snapshot.load().values.get(key).cloned()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.snapshot.load().values.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.snapshot.load().values.keys().cloned().collect()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        let snapshot = self.snapshot.load_full();
        for (key, value) in &snapshot.values {
            visit(key, value);
        }
    }

    fn is_empty(&self) -> bool {
        self.snapshot.load().values.is_empty()
    }

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

#[cfg(test)]
mod tests;
