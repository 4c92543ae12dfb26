//! Unit tests for the polling source and its scheduler.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use rstest::rstest;
use serde_json::json;

use super::*;

fn snapshot(pairs: &[(&str, &str)]) -> PollingSnapshot {
    PollingSnapshot::new(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), json!(v)))
            .collect(),
    )
}

#[rstest]
fn unchanged_snapshot_keeps_values_silently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = {
        let calls = Arc::clone(&calls);
        PollingSource::from_fn(move || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(snapshot(&[("a", "1")]))
            } else {
                Ok(PollingSnapshot::unchanged())
            }
        })
    };
    let events = Arc::new(AtomicUsize::new(0));
    let _sub = {
        let events = Arc::clone(&events);
        source.subscribe(Arc::new(move |_: &ConfigEvent| {
            events.fetch_add(1, Ordering::SeqCst);
        }))
    };

    assert!(matches!(source.poll(), PollOutcome::Updated));
    assert!(matches!(source.poll(), PollOutcome::Unchanged));
    assert_eq!(source.get_raw("a"), Some(json!("1")));
    assert_eq!(events.load(Ordering::SeqCst), 1);
    assert_eq!(source.update_count(), 1);
    assert!(source.last_update().is_some());
}

#[rstest]
fn instrumentation_ids_follow_snapshot() {
    let source = PollingSource::from_fn(|| {
        Ok(snapshot(&[("a", "1")]).with_ids(BTreeMap::from([("a".to_owned(), "row-7".to_owned())])))
    });
    assert_eq!(source.instrumentation_id("a"), None);
    source.poll();
    assert_eq!(source.instrumentation_id("a").as_deref(), Some("row-7"));
    assert_eq!(source.state(), PollState::Idle);
}

#[rstest]
fn failure_is_reported_in_error_state_then_reverts() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let source = {
        let attempts = Arc::clone(&attempts);
        Arc::new(PollingSource::from_fn(move || {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StrataError::fetch("backend down"))
            } else {
                Ok(snapshot(&[("a", "2")]))
            }
        }))
    };
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let _sub = {
        let seen = Arc::clone(&seen);
        let weak = Arc::downgrade(&source);
        source.subscribe(Arc::new(move |event: &ConfigEvent| {
            if let Some(polled) = weak.upgrade() {
                seen.lock().push((matches!(event, ConfigEvent::Error(_)), polled.state()));
            }
        }))
    };

    assert!(matches!(source.poll(), PollOutcome::Failed(_)));
    assert_eq!(source.state(), PollState::Idle);
    assert!(matches!(source.poll(), PollOutcome::Updated));
    assert_eq!(
        *seen.lock(),
        vec![(true, PollState::Error), (false, PollState::Idle)]
    );
}

#[rstest]
fn listener_may_poll_again_from_the_error_state() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let source = {
        let attempts = Arc::clone(&attempts);
        Arc::new(PollingSource::from_fn(move || {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StrataError::fetch("flaky"))
            } else {
                Ok(snapshot(&[("a", "retried")]))
            }
        }))
    };
    let _sub = {
        let weak = Arc::downgrade(&source);
        source.subscribe(Arc::new(move |event: &ConfigEvent| {
            if matches!(event, ConfigEvent::Error(_))
                && let Some(polled) = weak.upgrade()
            {
                assert!(matches!(polled.poll(), PollOutcome::Updated));
            }
        }))
    };

    assert!(matches!(source.poll(), PollOutcome::Failed(_)));
    assert_eq!(source.state(), PollState::Idle);
    assert_eq!(source.get_raw("a"), Some(json!("retried")));
}

#[rstest]
fn sync_init_failure_fails_start() {
    let source = Arc::new(PollingSource::from_fn(|| Err(StrataError::fetch("unreachable"))));
    let err = FixedPollingStrategy::new(Duration::from_secs(60))
        .start(Arc::clone(&source))
        .expect_err("first poll fails");
    assert!(matches!(&*err, StrataError::Fetch { .. }));
    assert_eq!(source.error_count(), 1);
}

#[rstest]
fn background_thread_polls_until_stopped() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = {
        let calls = Arc::clone(&calls);
        Arc::new(PollingSource::from_fn(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(snapshot(&[("n", &n.to_string())]))
        }))
    };
    let handle = FixedPollingStrategy::new(Duration::from_millis(5))
        .with_sync_init(false)
        .start(Arc::clone(&source))
        .expect("start");

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while source.update_count() < 3 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    handle.stop();
    let after_stop = calls.load(Ordering::SeqCst);
    assert!(after_stop >= 3, "expected at least three polls, saw {after_stop}");
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);
}
