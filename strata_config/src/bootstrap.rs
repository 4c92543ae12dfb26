//! Standard layered assembly.
//!
//! [`BootstrapSettings`] describes how the engine itself is set up and is
//! gathered with figment from built-in defaults, an optional settings file
//! and `STRATA_`-prefixed environment variables, in increasing precedence.
//! [`ConfigBootstrap`] turns the settings into a [`LayeredConfig`] with the
//! usual tiers populated:
//!
//! | Layer | Source |
//! |---|---|
//! | `RUNTIME` | `"runtime"`, a [`SettableSource`] |
//! | `SYSTEM` | `"system"`, `env` and `datacenter` from the settings |
//! | `ENVIRONMENT` | `"environment"`, a snapshot of the process environment |
//! | `REMOTE` | polled sources registered with the builder |
//! | `APPLICATION` | the cascade for `config_name` |
//!
//! Extra sources may be placed in any layer, for example `LIBRARY` or
//! `DEFAULTS`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::loader::{
    ConfigLoader, ConfigLoaderBuilder, ConfigReader, FileReader, read_figment,
};
use crate::polling::{FixedPollingStrategy, PollerHandle, PollingSource};
use crate::{
    EnvOptions, Layer, LayeredConfig, MapSource, PropertyFactory, PropertySource, SettableSource,
    StrataResult, StrataResultExt,
};

/// Prefix of environment variables read by [`BootstrapSettings::load`].
pub const SETTINGS_ENV_PREFIX: &str = "STRATA_";

/// Settings controlling how [`ConfigBootstrap`] assembles a configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    /// Base resource name for the application cascade.
    pub config_name: String,
    /// Deployment environment, exposed as the `env` property.
    pub environment: Option<String>,
    /// Datacenter, exposed as the `datacenter` property.
    pub datacenter: Option<String>,
    /// Whether a missing base resource fails the bootstrap.
    pub fail_on_first_missing: bool,
    /// Directories searched for configuration files, in order.
    pub search_paths: Vec<Utf8PathBuf>,
    /// Interval between polls of remote sources.
    pub poll_interval_ms: u64,
    /// Delay before the first background poll.
    pub poll_initial_delay_ms: u64,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            config_name: "application".to_owned(),
            environment: None,
            datacenter: None,
            fail_on_first_missing: false,
            search_paths: vec![Utf8PathBuf::from(".")],
            poll_interval_ms: 30_000,
            poll_initial_delay_ms: 0,
        }
    }
}

impl BootstrapSettings {
    /// Gathers settings from defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StrataError::Settings`] when a value cannot be
    /// deserialized.
    pub fn load() -> StrataResult<Self> {
        Self::load_from(None)
    }

    /// Like [`BootstrapSettings::load`], layering `file` between the defaults
    /// and the environment.
    ///
    /// Array settings such as `STRATA_SEARCH_PATHS` use figment's value
    /// syntax: `STRATA_SEARCH_PATHS='[conf, /etc/app]'`.
    ///
    /// # Errors
    ///
    /// Returns a resource error when `file` cannot be read or parsed and
    /// [`crate::StrataError::Settings`] when extraction fails.
    pub fn load_from(file: Option<&Utf8Path>) -> StrataResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(read_figment(path)?);
        }
        figment
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX))
            .extract()
            .into_strata()
    }

    /// Polling strategy for remote sources.
    #[must_use]
    pub const fn polling_strategy(&self) -> FixedPollingStrategy {
        FixedPollingStrategy::new(Duration::from_millis(self.poll_interval_ms))
            .with_initial_delay(Duration::from_millis(self.poll_initial_delay_ms))
    }

    /// Properties published in the `SYSTEM` layer.
    #[must_use]
    pub fn system_properties(&self) -> MapSource {
        let pairs = [("env", &self.environment), ("datacenter", &self.datacenter)];
        MapSource::from_pairs(
            pairs
                .into_iter()
                .filter_map(|(key, value)| value.as_deref().map(|v| (key, v.to_owned()))),
        )
    }
}

/// Builder assembling a [`LayeredConfig`] from [`BootstrapSettings`].
#[must_use = "call `build` to assemble the configuration"]
pub struct ConfigBootstrap {
    settings: BootstrapSettings,
    loader: ConfigLoaderBuilder,
    env: EnvOptions,
    overrides: Option<MapSource>,
    extra: Vec<(Layer, String, Arc<dyn PropertySource>)>,
    remote: Vec<(String, Arc<PollingSource>)>,
}

impl fmt::Debug for ConfigBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra: Vec<_> = self
            .extra
            .iter()
            .map(|(layer, name, _)| (layer.name(), name.as_str()))
            .collect();
        let remote: Vec<_> = self.remote.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ConfigBootstrap")
            .field("settings", &self.settings)
            .field("loader", &self.loader)
            .field("env", &self.env)
            .field("overrides", &self.overrides)
            .field("extra", &extra)
            .field("remote", &remote)
            .finish()
    }
}

impl ConfigBootstrap {
    /// Starts from `settings`.
    pub fn new(settings: BootstrapSettings) -> Self {
        Self {
            settings,
            loader: ConfigLoader::builder(),
            env: EnvOptions::new(),
            overrides: None,
            extra: Vec::new(),
            remote: Vec::new(),
        }
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Adds a reader consulted before the file reader.
    pub fn with_reader(mut self, reader: impl ConfigReader + 'static) -> Self {
        self.loader = self.loader.with_reader(reader);
        self
    }

    /// Overrides applied on top of every application cascade variant.
    pub fn with_overrides(mut self, overrides: MapSource) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Options for the environment snapshot.
    pub fn with_env_options(mut self, options: EnvOptions) -> Self {
        self.env = options;
        self
    }

    /// Places an additional source in `layer`.
    pub fn with_source(
        mut self,
        layer: Layer,
        name: impl Into<String>,
        source: Arc<dyn PropertySource>,
    ) -> Self {
        self.extra.push((layer, name.into(), source));
        self
    }

    /// Registers a remote source in the `REMOTE` layer, polled with
    /// [`BootstrapSettings::polling_strategy`].
    pub fn with_polling_source(
        mut self,
        name: impl Into<String>,
        source: Arc<PollingSource>,
    ) -> Self {
        self.remote.push((name.into(), source));
        self
    }

    /// Assembles the configuration.
    ///
    /// # Errors
    ///
    /// Fails on duplicate source names, when a remote source's first poll
    /// fails, or when the application base resource is required but cannot
    /// be loaded.
    pub fn build(self) -> StrataResult<Bootstrapped> {
        let settings = self.settings;
        let config = Arc::new(LayeredConfig::new(settings.config_name.clone()));

        let runtime = Arc::new(SettableSource::new());
        config.add_source(
            Layer::RUNTIME,
            "runtime",
            Arc::clone(&runtime) as Arc<dyn PropertySource>,
        )?;
        config.add_source(Layer::SYSTEM, "system", Arc::new(settings.system_properties()))?;
        config.add_source(
            Layer::ENVIRONMENT,
            "environment",
            Arc::new(self.env.capture()),
        )?;
        for (layer, name, source) in self.extra {
            config.add_source(layer, name, source)?;
        }

        let strategy = settings.polling_strategy();
        let mut pollers = Vec::with_capacity(self.remote.len());
        for (name, source) in self.remote {
            config.add_source(
                Layer::REMOTE,
                name,
                Arc::clone(&source) as Arc<dyn PropertySource>,
            )?;
            pollers.push(strategy.start(source)?);
        }

        let loader = self
            .loader
            .with_reader(FileReader::new(settings.search_paths.iter().cloned()))
            .with_fail_on_first(settings.fail_on_first_missing)
            .with_lookup(Arc::clone(&config) as Arc<dyn PropertySource>)
            .build();
        let mut request = loader.request();
        if let Some(overrides) = self.overrides {
            request = request.with_overrides(overrides);
        }
        let cascade = request.load(&settings.config_name)?;
        debug!(resources = ?cascade.names().collect::<Vec<_>>(), "application cascade loaded");
        let application = cascade.into_composite(settings.config_name.clone())?;
        config.add_source(
            Layer::APPLICATION,
            settings.config_name.clone(),
            Arc::new(application),
        )?;

        info!(
            config = %settings.config_name,
            sources = config.source_names().len(),
            keys = config.state().len(),
            "configuration assembled"
        );
        let factory = PropertyFactory::new(Arc::clone(&config) as Arc<dyn PropertySource>);
        Ok(Bootstrapped {
            config,
            runtime,
            factory,
            pollers,
        })
    }
}

/// Result of [`ConfigBootstrap::build`].
///
/// Dropping it stops any remote pollers.
#[derive(Debug)]
pub struct Bootstrapped {
    /// Root of the assembled configuration.
    pub config: Arc<LayeredConfig>,
    /// Runtime override source, the highest-priority layer.
    pub runtime: Arc<SettableSource>,
    /// Property factory over `config`.
    pub factory: PropertyFactory,
    /// Background pollers for remote sources.
    pub pollers: Vec<PollerHandle>,
}
