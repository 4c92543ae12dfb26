//! Failures collected while loading several cascade variants.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::StrataError;

/// Two or more errors raised by one load, in the order they occurred.
#[derive(Debug)]
pub struct AggregatedErrors(Vec<Arc<StrataError>>);

impl AggregatedErrors {
    pub(super) const fn new(errors: Vec<Arc<StrataError>>) -> Self {
        Self(errors)
    }

    /// Collected errors in occurrence order.
    #[must_use]
    pub fn errors(&self) -> &[Arc<StrataError>] {
        &self.0
    }

    /// Number of collected errors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for aggregates built by [`StrataError::aggregate`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                f.write_str("\n")?;
            }
            first = false;
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}
