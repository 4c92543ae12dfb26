//! Polling sources behind a layered configuration.
#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(
    clippy::expect_used,
    reason = "tests panic to surface configuration mistakes"
)]

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, ensure};
use rstest::rstest;
use serde_json::json;
use strata_config::polling::{PollOutcome, PollState, PollingSnapshot, PollingSource};
use strata_config::{ConfigEvent, Layer, LayeredConfig, PropertySource, StrataError};
use test_helpers::gate::Gate;

fn snapshot(value: &str) -> PollingSnapshot {
    PollingSnapshot::new(BTreeMap::from([("greeting".to_owned(), json!(value))]))
}

#[rstest]
fn second_poll_is_skipped_while_a_fetch_is_in_flight() -> Result<()> {
    let gate = Arc::new(Gate::new());
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = {
        let gate = Arc::clone(&gate);
        let fetches = Arc::clone(&fetches);
        PollingSource::from_fn(move || {
            fetches.fetch_add(1, Ordering::SeqCst);
            gate.enter_and_wait();
            Ok(snapshot("hello"))
        })
    };

    thread::scope(|scope| -> Result<()> {
        let first = scope.spawn(|| source.poll());
        ensure!(gate.wait_entered(Duration::from_secs(5)), "fetch never started");
        ensure!(source.state() == PollState::Fetching);
        ensure!(matches!(source.poll(), PollOutcome::Skipped));
        gate.open();
        let outcome = first.join().expect("poll thread");
        ensure!(matches!(outcome, PollOutcome::Updated));
        Ok(())
    })?;

    ensure!(fetches.load(Ordering::SeqCst) == 1);
    ensure!(source.state() == PollState::Idle);
    ensure!(source.get_raw("greeting") == Some(json!("hello")));
    Ok(())
}

#[rstest]
fn failed_fetch_keeps_previous_snapshot() -> Result<()> {
    let attempts = Arc::new(AtomicUsize::new(0));
    let source = Arc::new({
        let attempts = Arc::clone(&attempts);
        PollingSource::from_fn(move || {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(snapshot("first"))
            } else {
                Err(StrataError::fetch(io::Error::other("backend unavailable")))
            }
        })
    });
    let config = LayeredConfig::new("root");
    config.add_source(
        Layer::REMOTE,
        "remote",
        Arc::clone(&source) as Arc<dyn PropertySource>,
    )?;

    let errors = Arc::new(AtomicUsize::new(0));
    let updates = Arc::new(AtomicUsize::new(0));
    let _subscription = {
        let errors = Arc::clone(&errors);
        let updates = Arc::clone(&updates);
        config.subscribe(Arc::new(move |event: &ConfigEvent| match event {
            ConfigEvent::Error(_) => {
                errors.fetch_add(1, Ordering::SeqCst);
            }
            ConfigEvent::Updated { .. } => {
                updates.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }))
    };

    ensure!(matches!(source.poll(), PollOutcome::Updated));
    ensure!(matches!(source.poll(), PollOutcome::Failed(_)));

    ensure!(config.get_raw("greeting") == Some(json!("first")));
    ensure!(errors.load(Ordering::SeqCst) == 1);
    ensure!(updates.load(Ordering::SeqCst) == 1);
    ensure!(source.error_count() == 1);
    ensure!(source.update_count() == 1);
    Ok(())
}
