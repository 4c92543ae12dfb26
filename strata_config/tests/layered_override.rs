//! Override resolution across layers, end to end.
#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(
    clippy::expect_used,
    reason = "tests panic to surface configuration mistakes"
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Result, ensure};
use rstest::rstest;
use serde_json::json;
use strata_config::{
    ConfigExt, Layer, LayeredConfig, MapSource, PropertySource, StrataError, Value,
};

fn source<V: Into<Value>>(pairs: impl IntoIterator<Item = (&'static str, V)>) -> Arc<MapSource> {
    Arc::new(MapSource::from_pairs(pairs))
}

#[rstest]
#[case::low_to_high([0, 1, 2])]
#[case::high_to_low([2, 1, 0])]
#[case::mixed([1, 2, 0])]
fn highest_priority_source_wins_regardless_of_insertion_order(
    #[case] order: [usize; 3],
) -> Result<()> {
    let sources = [
        (Layer::DEFAULTS, "defaults", source([("a", 1), ("b", 1), ("c", 1)])),
        (Layer::APPLICATION, "application", source([("b", 2), ("c", 2)])),
        (Layer::RUNTIME, "runtime", source([("c", 3)])),
    ];
    let config = LayeredConfig::new("root");
    for index in order {
        let (layer, name, values) = sources.get(index).expect("index in range");
        config.add_source(*layer, *name, Arc::clone(values) as Arc<dyn PropertySource>)?;
    }

    for _ in 0..3 {
        ensure!(config.get_raw("a") == Some(json!(1)));
        ensure!(config.get_raw("b") == Some(json!(2)));
        ensure!(config.get_raw("c") == Some(json!(3)));
    }
    let winner = config.get_with_source("b").expect("b resolved");
    ensure!(winner.source() == "application");
    Ok(())
}

#[rstest]
fn interpolated_value_follows_layer_changes() -> Result<()> {
    let config = LayeredConfig::new("root");
    config.add_source(Layer::RUNTIME, "runtime", source([("env", "${base}")]))?;
    config.add_source(Layer::LIBRARY, "library", source([("base", "123")]))?;
    ensure!(config.get_string("env")? == "123");
    let before = config.keys().len();

    ensure!(config.remove_source(Layer::LIBRARY, "library").is_some());
    config.add_source(Layer::ENVIRONMENT, "environment", source([("base", "456")]))?;

    ensure!(config.get_string("env")? == "456");
    ensure!(config.keys().len() == before);
    Ok(())
}

#[rstest]
fn duplicate_name_leaves_keys_untouched() -> Result<()> {
    let config = LayeredConfig::new("root");
    config.add_source(Layer::APPLICATION, "x", source([("a", 1)]))?;
    let before = config.keys();

    let err = config
        .add_source(Layer::DEFAULTS, "x", source([("b", 2)]))
        .expect_err("duplicate");
    ensure!(matches!(&*err, StrataError::DuplicateSource { name } if name == "x"));
    ensure!(config.keys() == before);
    Ok(())
}

#[rstest]
fn self_reference_reports_a_cycle() -> Result<()> {
    let config = LayeredConfig::new("root");
    config.add_source(Layer::DEFAULTS, "defaults", source([("a", "${a}")]))?;
    let err = config.get_string("a").expect_err("cycle");
    ensure!(matches!(&*err, StrataError::InterpolationCycle { .. }));
    Ok(())
}

#[rstest]
fn readers_never_observe_a_partial_merge() -> Result<()> {
    const KEYS: usize = 64;
    let base: Vec<(String, Value)> = (0..KEYS).map(|i| (format!("a{i}"), json!(i))).collect();
    let extra: Vec<(String, Value)> = (0..KEYS).map(|i| (format!("b{i}"), json!(i))).collect();
    let old: BTreeSet<String> = base.iter().map(|(k, _)| k.clone()).collect();
    let new: BTreeSet<String> = old
        .iter()
        .cloned()
        .chain(extra.iter().map(|(k, _)| k.clone()))
        .collect();

    let config = LayeredConfig::new("root");
    config.add_source(Layer::DEFAULTS, "base", Arc::new(MapSource::from_pairs(base)))?;
    let done = AtomicBool::new(false);

    thread::scope(|scope| -> Result<()> {
        let reader = scope.spawn(|| -> Result<usize> {
            let mut observed = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                let keys: BTreeSet<String> = config.keys().into_iter().collect();
                ensure!(keys == old || keys == new, "partial key set of {}", keys.len());
                let state = config.state();
                ensure!(state.len() == KEYS || state.len() == 2 * KEYS);
                observed += 1;
                if finished {
                    return Ok(observed);
                }
            }
        });
        config.add_source(
            Layer::APPLICATION,
            "extra",
            Arc::new(MapSource::from_pairs(extra)),
        )?;
        done.store(true, Ordering::Release);
        let observed = reader.join().expect("reader thread")?;
        ensure!(observed > 0);
        Ok(())
    })?;

    ensure!(config.keys().len() == 2 * KEYS);
    Ok(())
}
