//! Extensions for mapping errors to `StrataResult` concisely.
//!
//! These helpers replace repetitive `.map_err(|e| Arc::new(StrataError::…))`
//! chains when converting collaborator errors into the crate's
//! [`StrataResult`] alias (`Result<T, Arc<StrataError>>`).

use std::error::Error;
use std::sync::Arc;

use crate::{StrataError, StrataResult};

/// Maps any `Result<T, E>` with `E: Into<StrataError>` into a [`StrataResult`].
pub trait StrataResultExt<T, E> {
    /// Convert `Result<T, E>` into `StrataResult<T>` using `Into<StrataError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into `Arc<StrataError>`.
    fn into_strata(self) -> StrataResult<T>;
}

impl<T, E> StrataResultExt<T, E> for Result<T, E>
where
    E: Into<StrataError>,
{
    fn into_strata(self) -> StrataResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}

/// Attributes reader failures to the resource being loaded.
pub trait ResourceResultExt<T> {
    /// Convert the error into [`StrataError::Resource`] for `resource`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is `Err`.
    fn for_resource(self, resource: &str) -> StrataResult<T>;
}

impl<T, E> ResourceResultExt<T> for Result<T, E>
where
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn for_resource(self, resource: &str) -> StrataResult<T> {
        self.map_err(|e| StrataError::resource(resource, e))
    }
}
