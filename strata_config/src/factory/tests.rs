//! Unit tests for cached property handles.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rstest::{fixture, rstest};
use test_helpers::gate::Gate;

use super::*;
use crate::{ConfigListener, Listeners, StrataError, Value};

/// Source that counts lookups and lets tests emit arbitrary events.
#[derive(Default)]
struct ManualSource {
    values: RwLock<BTreeMap<String, Value>>,
    reads: AtomicUsize,
    listeners: Listeners<ConfigEvent>,
    stall_next_read: Mutex<Option<Arc<Gate>>>,
}

impl ManualSource {
    fn set(&self, key: &str, value: impl Into<Value>) {
        self.values.write().insert(key.to_owned(), value.into());
        self.listeners.emit(&ConfigEvent::Updated { source: None });
    }

    fn set_silently(&self, key: &str, value: impl Into<Value>) {
        self.values.write().insert(key.to_owned(), value.into());
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes the next lookup hold its result until `gate` opens.
    fn stall_next_read(&self, gate: &Arc<Gate>) {
        *self.stall_next_read.lock() = Some(Arc::clone(gate));
    }
}

impl PropertySource for ManualSource {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let value = self.values.read().get(key).cloned();
        let stall = self.stall_next_read.lock().take();
        if let Some(gate) = stall {
            gate.enter_and_wait();
        }
        value
    }

    fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    fn for_each_property(&self, visit: &mut dyn FnMut(&str, &Value)) {
        for (key, value) in self.values.read().iter() {
            visit(key, value);
        }
    }

    fn subscribe(&self, listener: ConfigListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

#[fixture]
fn source() -> Arc<ManualSource> {
    Arc::new(ManualSource::default())
}

fn factory_over(source: &Arc<ManualSource>) -> PropertyFactory {
    PropertyFactory::new(Arc::clone(source) as Arc<dyn PropertySource>)
}

#[rstest]
fn unbound_keys_fall_back_to_default(source: Arc<ManualSource>) {
    let factory = factory_over(&source);
    let port = factory.property("port").as_i32(80);
    assert_eq!(port.get(), None);
    assert_eq!(port.value(), 80);

    source.set("port", "8080");
    assert_eq!(port.get(), Some(8080));
}

#[rstest]
fn resolves_once_per_version(source: Arc<ManualSource>) {
    source.set_silently("port", 1);
    let factory = factory_over(&source);
    let port = factory.property("port").as_i64(0);

    for _ in 0..3 {
        assert_eq!(port.value(), 1);
    }
    assert_eq!(source.reads(), 1);

    source.set("port", 2);
    assert_eq!(factory.version(), 1);
    for _ in 0..3 {
        assert_eq!(port.value(), 2);
    }
    assert_eq!(source.reads(), 2);
}

#[rstest]
fn error_events_do_not_bump_the_version(source: Arc<ManualSource>) {
    let factory = factory_over(&source);
    source
        .listeners
        .emit(&ConfigEvent::Error(StrataError::fetch("offline")));
    assert_eq!(factory.version(), 0);
    source.listeners.emit(&ConfigEvent::Added {
        source: "a".to_owned(),
    });
    source.listeners.emit(&ConfigEvent::Removed {
        source: "a".to_owned(),
    });
    assert_eq!(factory.version(), 2);
}

#[rstest]
fn decode_failure_keeps_last_good_value(source: Arc<ManualSource>) {
    source.set_silently("port", "80");
    let factory = factory_over(&source);
    let port = factory.property("port").as_i32(0);
    assert_eq!(port.get(), Some(80));

    source.set("port", "eighty");
    assert_eq!(port.get(), Some(80));
    assert_eq!(port.value(), 80);

    source.set("port", "eighty");
    let err = port.try_get().expect_err("undecodable");
    assert!(matches!(&*err, StrataError::Decode { key, .. } if key == "port"));
}

#[rstest]
fn observers_are_pushed_changes(source: Arc<ManualSource>) {
    source.set_silently("name", "a");
    let factory = factory_over(&source);
    let name = factory.property("name").as_string("");
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
    let errors = Arc::new(AtomicUsize::new(0));
    let subscription = {
        let seen = Arc::clone(&seen);
        let errors = Arc::clone(&errors);
        name.subscribe(Arc::new(move |event: &PropertyEvent<String>| match event {
            PropertyEvent::Changed(value) => seen.lock().push(value.clone()),
            PropertyEvent::Error(_) => {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        }))
    };

    source.set("other", "x");
    source.set("name", "b");
    source.values.write().remove("name");
    source.listeners.emit(&ConfigEvent::Updated { source: None });

    assert_eq!(*seen.lock(), vec![Some("b".to_owned()), None]);
    assert_eq!(errors.load(Ordering::SeqCst), 0);

    drop(subscription);
    source.set("name", "c");
    assert_eq!(seen.lock().len(), 2);
}

#[rstest]
fn superseded_resolution_never_replaces_a_newer_one(source: Arc<ManualSource>) {
    source.set_silently("mode", "old");
    let factory = factory_over(&source);
    let mode = factory.property("mode").as_string("");
    let pushed: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
    let _subscription = {
        let pushed = Arc::clone(&pushed);
        mode.subscribe(Arc::new(move |event: &PropertyEvent<String>| {
            if let PropertyEvent::Changed(value) = event {
                pushed.lock().push(value.clone());
            }
        }))
    };

    let gate = Arc::new(Gate::new());
    source.stall_next_read(&gate);
    thread::scope(|scope| {
        let slow = scope.spawn(|| source.set("mode", "mid"));
        assert!(gate.wait_entered(Duration::from_secs(5)), "refresh never started");
        source.set("mode", "new");
        assert_eq!(mode.value(), "new");
        gate.open();
        slow.join().expect("slow refresh");
    });

    assert_eq!(factory.version(), 2);
    assert_eq!(*pushed.lock(), vec![Some("new".to_owned())]);
    assert_eq!(mode.value(), "new");
    assert_eq!(mode.try_get().expect("resolved"), Some("new".to_owned()));
}

#[rstest]
fn observers_hear_resolution_errors(source: Arc<ManualSource>) {
    source.set_silently("retries", 3);
    let factory = factory_over(&source);
    let retries = factory.property("retries").as_u64(0);
    let errors = Arc::new(AtomicUsize::new(0));
    let _subscription = {
        let errors = Arc::clone(&errors);
        retries.subscribe(Arc::new(move |event: &PropertyEvent<u64>| {
            if matches!(event, PropertyEvent::Error(_)) {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        }))
    };
    source.set("retries", "-1");
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(retries.value(), 3);
}

#[rstest]
fn handles_share_cache_per_key_and_type(source: Arc<ManualSource>) {
    source.set_silently("port", "80");
    let factory = factory_over(&source);
    let first = factory.property("port").as_i32(1);
    let second = factory.property("port").as_i32(2);
    let text = factory.property("port").as_string("none");
    assert_eq!(factory.cached_properties(), 2);
    assert_eq!(first.value(), 80);
    assert_eq!(second.value(), 80);
    assert_eq!(text.value(), "80");
    assert_eq!(source.reads(), 2);
}

#[rstest]
fn values_are_interpolated_against_the_root(source: Arc<ManualSource>) {
    source.set_silently("host", "example.org");
    source.set_silently("url", "https://${host}/api");
    let factory = factory_over(&source);
    let url = factory.property("url").as_string("");
    assert_eq!(url.value(), "https://example.org/api");

    source.set("host", "example.com");
    assert_eq!(url.value(), "https://example.com/api");
}

#[rstest]
fn built_in_views(source: Arc<ManualSource>) {
    source.set_silently("debug", "yes");
    source.set_silently("timeout", 250);
    source.set_silently("ratio", "0.5");
    source.set_silently("hosts", "a, b,c");
    let factory = factory_over(&source);
    assert!(factory.property("debug").as_bool(false).value());
    assert_eq!(
        factory.property("timeout").as_duration(Duration::ZERO).value(),
        Duration::from_millis(250)
    );
    assert_eq!(factory.property("ratio").as_f64(0.0).value().to_string(), "0.5");
    assert_eq!(
        factory.property("hosts").as_list(Vec::new()).value(),
        vec!["a", "b", "c"]
    );
}

#[derive(Clone, Debug, PartialEq)]
struct Endpoint(String);

#[rstest]
fn custom_types_need_a_decoder(source: Arc<ManualSource>) {
    source.set_silently("endpoint", "db:5432");
    let factory = factory_over(&source);
    let err = factory
        .property("endpoint")
        .as_type(Endpoint(String::new()))
        .expect_err("no decoder");
    assert!(matches!(&*err, StrataError::UnknownType { .. }));

    let extended = factory.with_decoders(
        DecoderRegistry::default().with::<Endpoint, _>(|raw| Ok(Endpoint(raw.to_owned()))),
    );
    let endpoint = extended
        .property("endpoint")
        .as_type(Endpoint(String::new()))
        .expect("registered");
    assert_eq!(endpoint.value(), Endpoint("db:5432".to_owned()));
}

#[rstest]
fn dropping_the_factory_releases_the_root_subscription(source: Arc<ManualSource>) {
    let factory = factory_over(&source);
    assert_eq!(source.listeners.len(), 1);
    drop(factory);
    assert!(source.listeners.is_empty());
}
