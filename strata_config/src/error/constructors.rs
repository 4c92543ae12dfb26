//! Constructors for `StrataError` values shared across modules.

use std::error::Error;
use std::sync::Arc;

use super::{AggregatedErrors, StrataError};

impl StrataError {
    /// Folds several shared errors into one.
    ///
    /// Returns `None` when `errors` is empty, the sole error unchanged when
    /// there is exactly one, and [`Self::Aggregate`] otherwise.
    ///
    /// ```
    /// use strata_config::StrataError;
    ///
    /// let one = StrataError::aggregate([StrataError::not_found("a")]).expect("one error");
    /// assert!(matches!(*one, StrataError::NotFound { .. }));
    ///
    /// let two = StrataError::aggregate([StrataError::not_found("a"), StrataError::fetch("down")])
    ///     .expect("two errors");
    /// assert!(matches!(&*two, StrataError::Aggregate(all) if all.len() == 2));
    /// ```
    #[must_use]
    pub fn aggregate<I>(errors: I) -> Option<Arc<Self>>
    where
        I: IntoIterator<Item = Arc<Self>>,
    {
        let mut collected: Vec<Arc<Self>> = errors.into_iter().collect();
        match collected.len() {
            0 => None,
            1 => collected.pop(),
            _ => Some(Arc::new(Self::Aggregate(Box::new(AggregatedErrors::new(
                collected,
            ))))),
        }
    }

    /// Shared [`StrataError::NotFound`] for `key`.
    #[must_use]
    pub fn not_found(key: &str) -> Arc<Self> {
        Arc::new(Self::NotFound {
            key: key.to_owned(),
        })
    }

    /// Shared [`StrataError::Resource`] for a failed reader call.
    #[must_use]
    pub fn resource(
        resource: &str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Arc<Self> {
        Arc::new(Self::Resource {
            resource: resource.to_owned(),
            source: source.into(),
        })
    }

    /// Shared [`StrataError::Fetch`] wrapping a collaborator failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_config::StrataError;
    ///
    /// let err = StrataError::fetch("connection refused");
    /// assert!(matches!(*err, StrataError::Fetch { .. }));
    /// ```
    #[must_use]
    pub fn fetch(source: impl Into<Box<dyn Error + Send + Sync>>) -> Arc<Self> {
        Arc::new(Self::Fetch {
            source: source.into(),
        })
    }

    /// Returns `true` for authoring mistakes that are reported synchronously
    /// to the caller rather than through listeners.
    #[must_use]
    pub const fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Self::InterpolationCycle { .. }
                | Self::InterpolationDepth { .. }
                | Self::DuplicateSource { .. }
                | Self::UnknownType { .. }
        )
    }
}
