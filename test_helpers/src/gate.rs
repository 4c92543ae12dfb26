//! A one-shot latch for holding work in flight.
//!
//! A collaborator calls [`Gate::enter_and_wait`] from inside the operation
//! under test; the test thread uses [`Gate::wait_entered`] to know the
//! operation has started and [`Gate::open`] to let it finish.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use test_helpers::gate::Gate;
//!
//! let gate = Arc::new(Gate::new());
//! let worker = {
//!     let gate = Arc::clone(&gate);
//!     std::thread::spawn(move || gate.enter_and_wait())
//! };
//! assert!(gate.wait_entered(Duration::from_secs(5)));
//! gate.open();
//! worker.join().ok();
//! ```

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct GateState {
    entered: usize,
    open: bool,
}

/// Blocking latch shared between a test and the code it drives.
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Gate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an arrival and blocks until the gate is opened.
    pub fn enter_and_wait(&self) {
        let mut state = self.state.lock();
        state.entered += 1;
        self.changed.notify_all();
        while !state.open {
            self.changed.wait(&mut state);
        }
    }

    /// Waits until at least one caller has entered, up to `timeout`.
    ///
    /// Returns `false` when the timeout elapses first.
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.entered > 0 {
            return true;
        }
        let _timed_out = self
            .changed
            .wait_while_for(&mut state, |s| s.entered == 0, timeout);
        state.entered > 0
    }

    /// Opens the gate, releasing every waiting caller.
    pub fn open(&self) {
        self.state.lock().open = true;
        self.changed.notify_all();
    }

    /// Number of callers that have entered so far.
    #[must_use]
    pub fn entered(&self) -> usize {
        self.state.lock().entered
    }
}
