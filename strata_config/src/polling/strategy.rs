//! Fixed-interval background driver for [`PollingSource`].

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use super::{PollOutcome, PollingSource};
use crate::{StrataError, StrataResult};

/// Polls a source every `interval` on a dedicated thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPollingStrategy {
    interval: Duration,
    initial_delay: Duration,
    sync_init: bool,
}

impl FixedPollingStrategy {
    /// Polls every `interval`, starting immediately, with a synchronous
    /// first poll.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            initial_delay: Duration::ZERO,
            sync_init: true,
        }
    }

    /// Delay before the first background poll.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Whether [`FixedPollingStrategy::start`] performs the first poll on
    /// the calling thread and fails when it fails.
    #[must_use]
    pub const fn with_sync_init(mut self, sync_init: bool) -> Self {
        self.sync_init = sync_init;
        self
    }

    /// Polling period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts polling `source` until the returned handle is stopped or
    /// dropped.
    ///
    /// # Errors
    ///
    /// With synchronous initialisation, returns the first poll's error.
    /// Returns [`StrataError::Poller`] when the thread cannot be spawned.
    pub fn start(&self, source: Arc<PollingSource>) -> StrataResult<PollerHandle> {
        if self.sync_init
            && let PollOutcome::Failed(err) = source.poll()
        {
            return Err(err);
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let interval = self.interval;
        let mut wait = if self.sync_init && self.initial_delay.is_zero() {
            interval
        } else {
            self.initial_delay
        };
        let thread = thread::Builder::new()
            .name("strata-poller".into())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            let outcome = source.poll();
                            debug!(?outcome, "scheduled poll finished");
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    wait = interval;
                }
            })
            .map_err(|e| Arc::new(StrataError::Poller(e)))?;
        info!(?interval, "poller started");
        Ok(PollerHandle {
            stop: Some(stop),
            thread: Some(thread),
        })
    }
}

/// Keeps a poller thread running; stopping or dropping it joins the thread.
#[derive(Debug)]
#[must_use = "dropping the handle stops polling"]
pub struct PollerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signals the thread and waits for it to finish its current poll.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            debug!("poller thread panicked");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
