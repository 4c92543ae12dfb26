//! Tests for error construction, aggregation and classification.

use std::sync::Arc;

use super::*;
use rstest::rstest;

#[rstest]
fn aggregate_of_nothing_is_none() {
    assert!(StrataError::aggregate(Vec::new()).is_none());
}

#[rstest]
fn aggregate_passes_a_sole_error_through() {
    let shared = StrataError::not_found("a");
    let err = StrataError::aggregate([Arc::clone(&shared)]).expect("one error");
    assert!(Arc::ptr_eq(&err, &shared));
}

#[rstest]
fn aggregate_lists_every_error_in_order() {
    let err = StrataError::aggregate([
        StrataError::not_found("first"),
        StrataError::fetch("boom"),
    ])
    .expect("two errors");
    let StrataError::Aggregate(all) = &*err else {
        panic!("expected an aggregate, got {err}");
    };
    assert_eq!(all.len(), 2);
    assert!(matches!(
        all.errors().first().map(|first| &**first),
        Some(StrataError::NotFound { key }) if key == "first"
    ));
    assert_eq!(
        err.to_string(),
        "multiple configuration errors:\n- no configuration source defines 'first'\n- snapshot fetch failed: boom"
    );
}

#[rstest]
#[case(StrataError::InterpolationCycle { chain: "a -> a".into() }, true)]
#[case(StrataError::DuplicateSource { name: "x".into() }, true)]
#[case(StrataError::NotFound { key: "x".into() }, false)]
#[case(StrataError::MissingResource { resource: "app".into() }, false)]
fn misconfiguration_classification(#[case] err: StrataError, #[case] expected: bool) {
    assert_eq!(err.is_misconfiguration(), expected);
}

#[rstest]
fn unresolved_placeholder_renders_braces() {
    let err = StrataError::UnresolvedPlaceholder {
        key: "port".into(),
        template: "${port}".into(),
    };
    assert_eq!(
        err.to_string(),
        "unresolved placeholder '${port}' in '${port}'"
    );
}
