//! Cascading resource loading.
//!
//! [`ConfigLoader`] expands a base name with a [`CascadeStrategy`], asks
//! each registered [`ConfigReader`] in turn whether it can load a variant,
//! and lets the first capable reader load it. Failures on variants other
//! than the base are logged and skipped. The base name is always attempted;
//! when it cannot be loaded and fail-on-first-missing is enabled, the whole
//! load fails.
//!
//! ```
//! use serde_json::json;
//! use strata_config::PropertySource;
//! use strata_config::loader::{ConfigLoader, MapReader};
//!
//! let reader = MapReader::new()
//!     .with_resource("app", [("port", json!(80)), ("host", json!("localhost"))])
//!     .with_resource("app-prod", [("port", json!(443))]);
//! let loader = ConfigLoader::builder()
//!     .with_reader(reader)
//!     .with_lookup(std::sync::Arc::new(strata_config::MapSource::from_pairs([("env", "prod")])))
//!     .build();
//!
//! let config = loader.request().load("app")?.into_composite("app")?;
//! assert_eq!(config.get_raw("port"), Some(json!(443)));
//! assert_eq!(config.get_raw("host"), Some(json!("localhost")));
//! # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
//! ```

mod file;
mod reader;
mod result;
#[cfg(feature = "yaml")]
mod yaml;

pub use file::FileReader;
pub(crate) use file::read_figment;
pub use reader::MapReader;
pub use result::CascadeResult;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cascade::{CascadeStrategy, default_cascade};
use crate::interpolate::{EmptyLookup, Interpolator, Lookup, StrInterpolator};
use crate::{MapSource, PropertySource, SourceLookup, StrataError, StrataResult, Value};

/// Loads named resources into flat key/value maps.
pub trait ConfigReader: Send + Sync {
    /// Whether this reader can load `resource`.
    fn can_load(&self, resource: &str) -> bool;

    /// Loads `resource`.
    ///
    /// # Errors
    ///
    /// Any read or parse failure.
    fn load(&self, resource: &str) -> StrataResult<BTreeMap<String, Value>>;
}

/// Configured cascade loading pipeline.
#[derive(Clone)]
pub struct ConfigLoader {
    readers: Vec<Arc<dyn ConfigReader>>,
    strategy: Arc<dyn CascadeStrategy>,
    fail_on_first: bool,
    interpolator: Arc<dyn Interpolator>,
    lookup: Option<Arc<dyn PropertySource>>,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("readers", &self.readers.len())
            .field("strategy", &self.strategy)
            .field("fail_on_first", &self.fail_on_first)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Starts building a loader.
    #[must_use]
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::default()
    }

    /// Starts a load using the loader's defaults.
    #[must_use]
    pub fn request(&self) -> LoadRequest<'_> {
        LoadRequest {
            loader: self,
            strategy: None,
            fail_on_first: None,
            overrides: None,
        }
    }

    fn reader_for(&self, resource: &str) -> Option<&Arc<dyn ConfigReader>> {
        self.readers.iter().find(|reader| reader.can_load(resource))
    }
}

/// Builder for [`ConfigLoader`].
pub struct ConfigLoaderBuilder {
    readers: Vec<Arc<dyn ConfigReader>>,
    strategy: Arc<dyn CascadeStrategy>,
    fail_on_first: bool,
    interpolator: Arc<dyn Interpolator>,
    lookup: Option<Arc<dyn PropertySource>>,
}

impl Default for ConfigLoaderBuilder {
    fn default() -> Self {
        Self {
            readers: Vec::new(),
            strategy: Arc::new(default_cascade()),
            fail_on_first: false,
            interpolator: Arc::new(StrInterpolator::default()),
            lookup: None,
        }
    }
}

impl fmt::Debug for ConfigLoaderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoaderBuilder")
            .field("readers", &self.readers.len())
            .field("strategy", &self.strategy)
            .field("fail_on_first", &self.fail_on_first)
            .finish_non_exhaustive()
    }
}

impl ConfigLoaderBuilder {
    /// Appends a reader; earlier readers are asked first.
    #[must_use]
    pub fn with_reader(mut self, reader: impl ConfigReader + 'static) -> Self {
        self.readers.push(Arc::new(reader));
        self
    }

    /// Strategy used when a request does not supply one.
    #[must_use]
    pub fn with_default_strategy(mut self, strategy: impl CascadeStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// Whether a missing base resource fails the load.
    #[must_use]
    pub const fn with_fail_on_first(mut self, fail: bool) -> Self {
        self.fail_on_first = fail;
        self
    }

    /// Interpolator handed to cascade strategies.
    #[must_use]
    pub fn with_interpolator(mut self, interpolator: impl Interpolator + 'static) -> Self {
        self.interpolator = Arc::new(interpolator);
        self
    }

    /// Source consulted for cascade placeholders such as `${env}`.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn PropertySource>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Finishes the loader.
    #[must_use]
    pub fn build(self) -> ConfigLoader {
        ConfigLoader {
            readers: self.readers,
            strategy: self.strategy,
            fail_on_first: self.fail_on_first,
            interpolator: self.interpolator,
            lookup: self.lookup,
        }
    }
}

/// A single load with optional per-request settings.
#[must_use = "a request does nothing until `load` is called"]
pub struct LoadRequest<'a> {
    loader: &'a ConfigLoader,
    strategy: Option<Arc<dyn CascadeStrategy>>,
    fail_on_first: Option<bool>,
    overrides: Option<MapSource>,
}

impl fmt::Debug for LoadRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("strategy", &self.strategy)
            .field("fail_on_first", &self.fail_on_first)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl LoadRequest<'_> {
    /// Overrides the loader's default strategy.
    pub fn with_cascade_strategy(mut self, strategy: impl CascadeStrategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Overrides the loader's fail-on-first-missing flag.
    pub const fn with_fail_on_first(mut self, fail: bool) -> Self {
        self.fail_on_first = Some(fail);
        self
    }

    /// Adds explicit overrides, stored as `<base>_overrides`, that outrank
    /// every loaded variant.
    pub fn with_overrides(mut self, overrides: MapSource) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Runs the cascade for `base`.
    ///
    /// # Errors
    ///
    /// With fail-on-first-missing enabled, returns
    /// [`StrataError::MissingResource`] when no reader can load `base`, or
    /// the reader's error when loading it fails. Other failures are skipped
    /// and recorded in [`CascadeResult::skipped`].
    pub fn load(self, base: &str) -> StrataResult<CascadeResult> {
        let loader = self.loader;
        let strategy = self
            .strategy
            .unwrap_or_else(|| Arc::clone(&loader.strategy));
        let fail_on_first = self.fail_on_first.unwrap_or(loader.fail_on_first);

        let source_lookup = loader.lookup.as_deref().map(SourceLookup::new);
        let lookup: &dyn Lookup = match &source_lookup {
            Some(lookup) => lookup,
            None => &EmptyLookup,
        };
        let mut variants = strategy.generate(base, loader.interpolator.as_ref(), lookup);
        if variants.first().map(String::as_str) != Some(base) {
            variants.retain(|variant| variant != base);
            variants.insert(0, base.to_owned());
        }
        debug!(base, ?variants, "cascade variants generated");

        let mut result = CascadeResult::default();
        if let Some(overrides) = self.overrides {
            result.insert_overrides(format!("{base}_overrides"), overrides);
        }

        for (index, variant) in variants.iter().enumerate() {
            let is_base = index == 0;
            let Some(reader) = loader.reader_for(variant) else {
                if is_base && fail_on_first {
                    return Err(Arc::new(StrataError::MissingResource {
                        resource: variant.clone(),
                    }));
                }
                debug!(resource = %variant, "no reader can load cascade variant");
                continue;
            };
            match reader.load(variant) {
                Ok(values) => result.insert(variant.clone(), MapSource::from_map(values)),
                Err(err) if is_base && fail_on_first => return Err(err),
                Err(err) => {
                    warn!(resource = %variant, error = %err, "skipping cascade variant");
                    result.skip(err);
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests;
