//! Expansion of a resource base name into override variants.
//!
//! A [`CascadeStrategy`] is a pure function: given `application` it might
//! return `["application", "application-prod", "application-prod-eu1"]`.
//! The base name always comes first and has the lowest precedence; later
//! names are more specific overrides. Strategies never perform I/O.

use std::fmt;

use tracing::trace;

use crate::interpolate::{Interpolator, Lookup};

/// Placeholder standing for the base name inside cascade patterns.
pub const NAME_PLACEHOLDER: &str = "name";

/// Produces resource name variants for a base name.
pub trait CascadeStrategy: Send + Sync + fmt::Debug {
    /// Returns the variants for `base`, starting with `base` itself and
    /// free of duplicates.
    fn generate(&self, base: &str, interpolator: &dyn Interpolator, lookup: &dyn Lookup)
    -> Vec<String>;
}

fn push_unique(variants: &mut Vec<String>, candidate: String) {
    if !variants.contains(&candidate) {
        variants.push(candidate);
    }
}

/// Loads only the base name.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCascadeStrategy;

impl CascadeStrategy for NoCascadeStrategy {
    fn generate(&self, base: &str, _: &dyn Interpolator, _: &dyn Lookup) -> Vec<String> {
        vec![base.to_owned()]
    }
}

/// Binds `${name}` to the base while delegating everything else.
struct WithName<'a> {
    base: &'a str,
    inner: &'a dyn Lookup,
}

impl Lookup for WithName<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        if key == NAME_PLACEHOLDER {
            Some(self.base.to_owned())
        } else {
            self.inner.lookup(key)
        }
    }
}

/// Interpolates each pattern, with `${name}` bound to the base.
///
/// Permutations whose placeholders cannot all be resolved are dropped.
///
/// ```
/// use std::collections::HashMap;
/// use strata_config::cascade::{CascadeStrategy, InterpolatingCascadeStrategy};
/// use strata_config::interpolate::StrInterpolator;
///
/// let strategy = InterpolatingCascadeStrategy::new(["${name}-${env}", "${name}-${region}"]);
/// let lookup = HashMap::from([("env".to_owned(), "prod".to_owned())]);
/// let variants = strategy.generate("app", &StrInterpolator::default(), &lookup);
/// assert_eq!(variants, vec!["app", "app-prod"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterpolatingCascadeStrategy {
    patterns: Vec<String>,
}

impl InterpolatingCascadeStrategy {
    /// Strategy expanding `patterns` in order.
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

impl CascadeStrategy for InterpolatingCascadeStrategy {
    fn generate(
        &self,
        base: &str,
        interpolator: &dyn Interpolator,
        lookup: &dyn Lookup,
    ) -> Vec<String> {
        let named = WithName { base, inner: lookup };
        let mut variants = vec![base.to_owned()];
        for pattern in &self.patterns {
            match interpolator.resolve(pattern, &named) {
                Ok(candidate) if !candidate.contains("${") => push_unique(&mut variants, candidate),
                Ok(candidate) => trace!(pattern = %pattern, candidate = %candidate, "dropping unresolved cascade variant"),
                Err(err) => trace!(pattern = %pattern, error = %err, "dropping unresolved cascade variant"),
            }
        }
        variants
    }
}

/// Appends each resolved parameter cumulatively: `base`, `base-p1`,
/// `base-p1-p2`. Expansion stops at the first unresolved parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcatCascadeStrategy {
    parameters: Vec<String>,
    separator: String,
}

impl ConcatCascadeStrategy {
    /// Strategy over the placeholder names in `parameters`, joined with `-`.
    #[must_use]
    pub fn new<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameters: parameters.into_iter().map(Into::into).collect(),
            separator: "-".to_owned(),
        }
    }

    /// Overrides the separator.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl CascadeStrategy for ConcatCascadeStrategy {
    fn generate(
        &self,
        base: &str,
        interpolator: &dyn Interpolator,
        lookup: &dyn Lookup,
    ) -> Vec<String> {
        let mut variants = vec![base.to_owned()];
        let mut current = base.to_owned();
        for parameter in &self.parameters {
            let value = match interpolator.resolve(&format!("${{{parameter}}}"), lookup) {
                Ok(value) if !value.is_empty() && !value.contains("${") => value,
                _ => break,
            };
            current = format!("{current}{}{value}", self.separator);
            push_unique(&mut variants, current.clone());
        }
        variants
    }
}

/// Environment then environment-and-datacenter suffixes.
#[must_use]
pub fn default_cascade() -> InterpolatingCascadeStrategy {
    InterpolatingCascadeStrategy::new(["${name}-${env}", "${name}-${env}-${datacenter}"])
}
