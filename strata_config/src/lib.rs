//! Layered, dynamically updating configuration.
//!
//! Configuration is a tree of [`PropertySource`]s. Leaves hold key/value
//! data ([`MapSource`], [`SettableSource`], [`EnvironmentSource`],
//! [`polling::PollingSource`]); composites ([`LayeredConfig`],
//! [`CompositeConfig`]) resolve every key to the value of their
//! highest-priority child and republish an immutable snapshot whenever a
//! child changes. Values may reference other keys with `${key}` placeholders,
//! resolved at read time against the root.
//!
//! Resources are discovered by expanding a base name through a
//! [`cascade::CascadeStrategy`] and loading each variant with a
//! [`loader::ConfigReader`]. Typed, cached, live access goes through a
//! [`PropertyFactory`]. [`ConfigBootstrap`] wires the usual layers together.
//!
//! ```
//! use std::sync::Arc;
//! use strata_config::{ConfigExt, Layer, LayeredConfig, MapSource, SettableSource};
//!
//! let config = LayeredConfig::new("app");
//! let runtime = Arc::new(SettableSource::new());
//! config.add_source(Layer::RUNTIME, "runtime", runtime.clone())?;
//! config.add_source(
//!     Layer::DEFAULTS,
//!     "defaults",
//!     Arc::new(MapSource::from_pairs([("host", "localhost"), ("url", "http://${host}")])),
//! )?;
//! assert_eq!(config.get_string("url")?, "http://localhost");
//!
//! runtime.set_property("host", "example.org");
//! assert_eq!(config.get_string("url")?, "http://example.org");
//! # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
//! ```

use std::sync::Arc;

mod bootstrap;
mod composite;
mod error;
mod event;
mod factory;
mod layer;
mod result_ext;
mod source;
mod value;

pub mod cascade;
pub mod decode;
pub mod interpolate;
pub mod loader;
pub mod polling;

pub use bootstrap::{BootstrapSettings, Bootstrapped, ConfigBootstrap, SETTINGS_ENV_PREFIX};
pub use composite::{
    ChildInfo, CompositeConfig, CompositeState, ConfigVisitor, DescribeVisitor, LayeredConfig,
    LoggingVisitor, ResolvedEntry,
};
pub use error::{AggregatedErrors, StrataError};
pub use event::{Callback, ConfigEvent, ConfigListener, Listeners, Subscription};
pub use factory::{Property, PropertyEvent, PropertyFactory, PropertyListener, PropertyRef};
pub use layer::Layer;
pub use result_ext::{ResourceResultExt, StrataResultExt};
pub use source::{
    ConfigExt, EnvOptions, EnvironmentSource, MapSource, PrefixedView, PropertySource,
    SettableSource, SourceLookup,
};
pub use value::{Value, to_raw_string};

/// Result alias used throughout the crate. Errors are shared so they can be
/// delivered to several listeners.
pub type StrataResult<T> = Result<T, Arc<StrataError>>;
