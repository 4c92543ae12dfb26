//! `${key}` placeholder substitution.
//!
//! [`StrInterpolator`] understands `${key}` and `${key:default}`. Looked-up
//! values and defaults are themselves resolved, placeholders may be nested
//! inside key names (`${db.${env}.host}`), and `$${` produces a literal
//! `${`. A key that resolves back to itself, directly or transitively, or a
//! chain deeper than the configured limit, aborts that single resolution
//! with an error instead of returning a partial string.
//!
//! ```
//! use std::collections::HashMap;
//! use strata_config::interpolate::{Interpolator, StrInterpolator};
//!
//! let values = HashMap::from([
//!     ("host".to_owned(), "db.internal".to_owned()),
//!     ("url".to_owned(), "postgres://${host}:${port:5432}".to_owned()),
//! ]);
//! let url = StrInterpolator::default().resolve("${url}", &values)?;
//! assert_eq!(url, "postgres://db.internal:5432");
//! # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::trace;

use crate::{StrataError, StrataResult};

/// Recursion limit applied by [`StrInterpolator::default`].
pub const DEFAULT_MAX_DEPTH: usize = 32;

const OPEN: &str = "${";
const ESCAPED_OPEN: &str = "$${";

/// Resolves placeholder keys to replacement text.
pub trait Lookup {
    /// Returns the text bound to `key`, if any.
    fn lookup(&self, key: &str) -> Option<String>;
}

impl Lookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Lookup for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Adapts a closure into a [`Lookup`].
#[derive(Clone, Copy, Debug)]
pub struct FnLookup<F>(pub F);

impl<F> Lookup for FnLookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }
}

/// Lookup that never resolves anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyLookup;

impl Lookup for EmptyLookup {
    fn lookup(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Placeholder resolution strategy.
pub trait Interpolator: Send + Sync {
    /// Resolves every placeholder in `template` against `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::InterpolationCycle`] or
    /// [`StrataError::InterpolationDepth`] for runaway recursion, and
    /// [`StrataError::UnresolvedPlaceholder`] for misses without a default
    /// when the implementation is strict.
    fn resolve(&self, template: &str, lookup: &dyn Lookup) -> StrataResult<String>;
}

/// Default `${key:default}` interpolator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrInterpolator {
    max_depth: usize,
    strict: bool,
}

impl Default for StrInterpolator {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: true,
        }
    }
}

impl StrInterpolator {
    /// Interpolator that leaves unresolvable placeholders in place.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    /// Overrides the recursion limit.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether misses without a default are errors.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Interpolator for StrInterpolator {
    fn resolve(&self, template: &str, lookup: &dyn Lookup) -> StrataResult<String> {
        let mut resolution = Resolution {
            settings: self,
            lookup,
            template,
            in_progress: Vec::new(),
        };
        resolution.expand(template, 0)
    }
}

/// State for one top-level `resolve` call.
struct Resolution<'a> {
    settings: &'a StrInterpolator,
    lookup: &'a dyn Lookup,
    template: &'a str,
    in_progress: Vec<String>,
}

impl Resolution<'_> {
    fn expand(&mut self, text: &str, depth: usize) -> StrataResult<String> {
        if depth > self.settings.max_depth {
            return Err(Arc::new(StrataError::InterpolationDepth {
                template: self.template.to_owned(),
                limit: self.settings.max_depth,
            }));
        }
        if !text.contains('$') {
            return Ok(text.to_owned());
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('$') {
            let (literal, tail) = rest.split_at(pos);
            out.push_str(literal);
            if let Some(after) = tail.strip_prefix(ESCAPED_OPEN) {
                out.push_str(OPEN);
                rest = after;
            } else if let Some(body) = tail.strip_prefix(OPEN) {
                let Some(end) = closing_brace(body) else {
                    // Unterminated placeholders are kept literally.
                    out.push_str(tail);
                    return Ok(out);
                };
                let (inner, remainder) = body.split_at(end);
                out.push_str(&self.placeholder(inner, depth)?);
                rest = remainder.strip_prefix('}').unwrap_or(remainder);
            } else {
                let (dollar, after) = tail.split_at(1);
                out.push_str(dollar);
                rest = after;
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn placeholder(&mut self, inner: &str, depth: usize) -> StrataResult<String> {
        let (raw_key, default) = split_default(inner);
        let key = self.expand(raw_key, depth + 1)?;

        if let Some(start) = self.in_progress.iter().position(|k| *k == key) {
            let mut chain: Vec<&str> = self
                .in_progress
                .iter()
                .skip(start)
                .map(String::as_str)
                .collect();
            chain.push(&key);
            return Err(Arc::new(StrataError::InterpolationCycle {
                chain: chain.join(" -> "),
            }));
        }

        match self.lookup.lookup(&key) {
            Some(value) => {
                trace!(key = %key, depth, "resolved placeholder");
                self.in_progress.push(key);
                let resolved = self.expand(&value, depth + 1);
                self.in_progress.pop();
                resolved
            }
            None => match default {
                Some(fallback) => self.expand(fallback, depth + 1),
                None if self.settings.strict => Err(Arc::new(StrataError::UnresolvedPlaceholder {
                    key,
                    template: self.template.to_owned(),
                })),
                None => Ok(format!("{OPEN}{inner}}}")),
            },
        }
    }
}

/// Byte offset of the `}` closing a placeholder body, honouring nested
/// placeholders.
fn closing_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut nesting = 0_usize;
    let mut i = 0;
    while let Some(&byte) = bytes.get(i) {
        match byte {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                nesting += 1;
                i += 2;
                continue;
            }
            b'}' if nesting == 0 => return Some(i),
            b'}' => nesting -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Splits `key:default` at the first top-level colon.
fn split_default(inner: &str) -> (&str, Option<&str>) {
    let bytes = inner.as_bytes();
    let mut nesting = 0_usize;
    let mut i = 0;
    while let Some(&byte) = bytes.get(i) {
        match byte {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                nesting += 1;
                i += 2;
                continue;
            }
            b'}' => nesting = nesting.saturating_sub(1),
            b':' if nesting == 0 => {
                let (key, default) = inner.split_at(i);
                return (key, default.strip_prefix(':'));
            }
            _ => {}
        }
        i += 1;
    }
    (inner, None)
}
