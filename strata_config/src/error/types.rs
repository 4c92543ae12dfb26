//! Primary error enum for configuration resolution flows.

use std::error::Error;

use thiserror::Error;

use super::aggregate::AggregatedErrors;

/// Errors that can occur while assembling or reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StrataError {
    /// No source defines the requested key.
    #[error("no configuration source defines '{key}'")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },

    /// The interpolated value could not be converted to the requested type.
    #[error("cannot decode '{key}' value '{value}' as {target}: {message}")]
    Decode {
        /// Key whose value failed to decode.
        key: String,
        /// Interpolated text handed to the decoder.
        value: String,
        /// Name of the requested target type.
        target: &'static str,
        /// Decoder diagnostic.
        message: String,
    },

    /// A placeholder resolves back to itself.
    #[error("interpolation cycle detected: {chain}")]
    InterpolationCycle {
        /// Keys participating in the cycle, rendered as `a -> b -> a`.
        chain: String,
    },

    /// Placeholder nesting exceeded the interpolator's depth limit.
    #[error("interpolation of '{template}' exceeded the depth limit of {limit}")]
    InterpolationDepth {
        /// Template whose resolution was abandoned.
        template: String,
        /// Configured recursion limit.
        limit: usize,
    },

    /// A placeholder had no value and no default while strict resolution
    /// was in effect.
    #[error("unresolved placeholder '${{{key}}}' in '{template}'")]
    UnresolvedPlaceholder {
        /// Key the placeholder referred to.
        key: String,
        /// Template being resolved.
        template: String,
    },

    /// A composite already holds a source with the same name.
    #[error("a source named '{name}' is already registered")]
    DuplicateSource {
        /// Rejected source name.
        name: String,
    },

    /// A reader failed to load a named resource.
    #[error("failed to load resource '{resource}': {source}")]
    Resource {
        /// Resource name handed to the reader.
        resource: String,
        /// Underlying reader failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// The base resource of a cascade was required but could not be loaded.
    #[error("required resource '{resource}' could not be loaded")]
    MissingResource {
        /// Base resource name.
        resource: String,
    },

    /// A polling snapshot fetch failed.
    #[error("snapshot fetch failed: {source}")]
    Fetch {
        /// Underlying fetch failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// The background poller thread could not be started.
    #[error("failed to start poller: {0}")]
    Poller(#[source] std::io::Error),

    /// A typed read asked for a type the decoder registry does not know.
    #[error("no decoder registered for type {type_name}")]
    UnknownType {
        /// Name of the unregistered type.
        type_name: &'static str,
    },

    /// Bootstrap settings could not be gathered.
    #[error("failed to gather bootstrap settings: {0}")]
    Settings(#[from] Box<figment::Error>),

    /// Several errors occurred during a single operation.
    #[error("multiple configuration errors:\n{0}")]
    Aggregate(Box<AggregatedErrors>),
}
