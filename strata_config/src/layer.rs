//! Priority tiers used to order sources inside a [`crate::LayeredConfig`].

use std::fmt;

/// A named priority tier.
///
/// Lower `priority` numbers win. Within a layer, sources are ordered by
/// insertion: the earliest inserted source wins unless the layer is
/// `reversed`, in which case the most recently inserted source wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layer {
    name: &'static str,
    priority: u16,
    reversed: bool,
}

impl Layer {
    /// Values set programmatically while the process runs.
    pub const RUNTIME: Self = Self::new("runtime", 100, true);
    /// Explicit overrides supplied by an operator or test harness.
    pub const OVERRIDE: Self = Self::new("override", 200, true);
    /// Process-level facts such as the deployment environment.
    pub const SYSTEM: Self = Self::new("system", 300, false);
    /// Environment variables.
    pub const ENVIRONMENT: Self = Self::new("environment", 400, false);
    /// Remotely polled configuration.
    pub const REMOTE: Self = Self::new("remote", 500, false);
    /// Application resources.
    pub const APPLICATION: Self = Self::new("application", 600, false);
    /// Resources contributed by libraries.
    pub const LIBRARY: Self = Self::new("library", 700, false);
    /// Built-in defaults.
    pub const DEFAULTS: Self = Self::new("defaults", 800, false);

    /// Defines a custom layer.
    #[must_use]
    pub const fn new(name: &'static str, priority: u16, reversed: bool) -> Self {
        Self {
            name,
            priority,
            reversed,
        }
    }

    /// Layer name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Numeric priority; lower wins.
    #[must_use]
    pub const fn priority(&self) -> u16 {
        self.priority
    }

    /// Whether later insertions outrank earlier ones.
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversed
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.priority)
    }
}
