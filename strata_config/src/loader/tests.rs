//! Unit tests for the cascade pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::cascade::{ConcatCascadeStrategy, NoCascadeStrategy};

/// Claims every resource but fails to load the ones listed.
struct BrokenReader(Vec<&'static str>);

impl ConfigReader for BrokenReader {
    fn can_load(&self, _resource: &str) -> bool {
        true
    }

    fn load(&self, resource: &str) -> StrataResult<BTreeMap<String, Value>> {
        if self.0.iter().any(|broken| *broken == resource) {
            Err(StrataError::resource(resource, "corrupt"))
        } else {
            Ok(BTreeMap::from([("from".to_owned(), json!(resource))]))
        }
    }
}

#[fixture]
fn env_lookup() -> Arc<dyn PropertySource> {
    Arc::new(MapSource::from_pairs([("env", "prod"), ("datacenter", "eu1")]))
}

#[rstest]
fn variants_load_in_cascade_order(env_lookup: Arc<dyn PropertySource>) {
    let reader = MapReader::new()
        .with_resource("app", [("a", 1), ("b", 1), ("c", 1)])
        .with_resource("app-prod", [("b", 2), ("c", 2)])
        .with_resource("app-prod-eu1", [("c", 3)]);
    let loader = ConfigLoader::builder()
        .with_reader(reader)
        .with_lookup(env_lookup)
        .build();

    let result = loader.request().load("app").expect("load");
    assert_eq!(
        result.names().collect::<Vec<_>>(),
        vec!["app", "app-prod", "app-prod-eu1"]
    );
    let config = result.into_composite("app").expect("composite");
    assert_eq!(config.get_raw("a"), Some(json!(1)));
    assert_eq!(config.get_raw("b"), Some(json!(2)));
    assert_eq!(config.get_raw("c"), Some(json!(3)));
}

#[rstest]
fn overrides_outrank_every_variant(env_lookup: Arc<dyn PropertySource>) {
    let reader = MapReader::new()
        .with_resource("app", [("a", 1)])
        .with_resource("app-prod", [("a", 2)]);
    let loader = ConfigLoader::builder()
        .with_reader(reader)
        .with_lookup(env_lookup)
        .build();

    let result = loader
        .request()
        .with_overrides(MapSource::from_pairs([("a", 99)]))
        .load("app")
        .expect("load");
    assert_eq!(result.names().next(), Some("app_overrides"));
    let config = result.into_composite("app").expect("composite");
    assert_eq!(config.get_raw("a"), Some(json!(99)));
    assert_eq!(
        config.source_names(),
        vec!["app_overrides", "app-prod", "app"]
    );
}

#[rstest]
#[case::lenient(false)]
#[case::strict(true)]
fn missing_base(#[case] fail_on_first: bool) {
    let loader = ConfigLoader::builder()
        .with_reader(MapReader::new().with_resource("other", [("a", 1)]))
        .with_fail_on_first(fail_on_first)
        .build();
    let outcome = loader.request().load("app");
    if fail_on_first {
        let err = outcome.expect_err("base required");
        assert!(matches!(&*err, StrataError::MissingResource { resource } if resource == "app"));
    } else {
        assert!(outcome.expect("empty result").is_empty());
    }
}

#[rstest]
fn non_base_failures_are_skipped(env_lookup: Arc<dyn PropertySource>) {
    let loader = ConfigLoader::builder()
        .with_reader(BrokenReader(vec!["app-prod"]))
        .with_lookup(env_lookup)
        .with_fail_on_first(true)
        .build();
    let result = loader.request().load("app").expect("load");
    assert_eq!(
        result.names().collect::<Vec<_>>(),
        vec!["app", "app-prod-eu1"]
    );
    assert_eq!(result.skipped().len(), 1);
    let err = result.skipped_error().expect("one skipped variant");
    assert!(matches!(&*err, StrataError::Resource { resource, .. } if resource == "app-prod"));
}

#[rstest]
fn skipped_variants_fold_into_one_error(env_lookup: Arc<dyn PropertySource>) {
    let loader = ConfigLoader::builder()
        .with_reader(BrokenReader(vec!["app-prod", "app-prod-eu1"]))
        .with_lookup(env_lookup)
        .build();
    let result = loader.request().load("app").expect("load");
    assert_eq!(result.names().collect::<Vec<_>>(), vec!["app"]);

    let err = result.skipped_error().expect("skipped variants");
    let StrataError::Aggregate(all) = &*err else {
        panic!("expected an aggregate, got {err}");
    };
    let resources: Vec<&str> = all
        .errors()
        .iter()
        .filter_map(|skipped| match &**skipped {
            StrataError::Resource { resource, .. } => Some(resource.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(resources, vec!["app-prod", "app-prod-eu1"]);
    let config = result.into_composite("app").expect("composite");
    assert_eq!(config.get_raw("from"), Some(json!("app")));
}

#[rstest]
fn clean_load_skips_nothing(env_lookup: Arc<dyn PropertySource>) {
    let loader = ConfigLoader::builder()
        .with_reader(BrokenReader(Vec::new()))
        .with_lookup(env_lookup)
        .build();
    let result = loader.request().load("app").expect("load");
    assert!(result.skipped().is_empty());
    assert!(result.skipped_error().is_none());
}

#[rstest]
fn base_failure_propagates_when_required() {
    let loader = ConfigLoader::builder()
        .with_reader(BrokenReader(vec!["app"]))
        .build();
    assert!(loader.request().load("app").expect("lenient").is_empty());
    let err = loader
        .request()
        .with_fail_on_first(true)
        .load("app")
        .expect_err("strict");
    assert!(matches!(&*err, StrataError::Resource { resource, .. } if resource == "app"));
}

#[derive(Debug)]
struct ForgetfulStrategy;

impl CascadeStrategy for ForgetfulStrategy {
    fn generate(&self, base: &str, _: &dyn Interpolator, _: &dyn Lookup) -> Vec<String> {
        vec![format!("{base}-extra"), base.to_owned()]
    }
}

#[rstest]
fn base_is_always_attempted_first() {
    let loader = ConfigLoader::builder()
        .with_reader(BrokenReader(Vec::new()))
        .build();
    let result = loader
        .request()
        .with_cascade_strategy(ForgetfulStrategy)
        .load("app")
        .expect("load");
    assert_eq!(result.names().collect::<Vec<_>>(), vec!["app", "app-extra"]);
}

#[rstest]
fn per_request_strategy_overrides_default(env_lookup: Arc<dyn PropertySource>) {
    let loader = ConfigLoader::builder()
        .with_reader(BrokenReader(Vec::new()))
        .with_default_strategy(NoCascadeStrategy)
        .with_lookup(env_lookup)
        .build();
    assert_eq!(loader.request().load("app").expect("load").len(), 1);
    let result = loader
        .request()
        .with_cascade_strategy(ConcatCascadeStrategy::new(["env", "datacenter"]))
        .load("app")
        .expect("load");
    assert_eq!(
        result.names().collect::<Vec<_>>(),
        vec!["app", "app-prod", "app-prod-eu1"]
    );
}
