//! Diagnostic traversal of composites.

use tracing::info;

use super::state::ResolvedEntry;
use crate::{Layer, PropertySource, to_raw_string};

/// Receives either resolved keys or children from a composite's `accept_*`
/// methods. Both callbacks default to doing nothing.
pub trait ConfigVisitor {
    /// Called once per resolved key, in key order.
    fn visit_key(&mut self, _key: &str, _entry: &ResolvedEntry) {}

    /// Called once per child, winner first.
    fn visit_child(&mut self, _layer: Option<Layer>, _name: &str, _source: &dyn PropertySource) {
    }
}

/// Logs every visited key or child at `info` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingVisitor;

impl ConfigVisitor for LoggingVisitor {
    fn visit_key(&mut self, key: &str, entry: &ResolvedEntry) {
        info!(key, source = entry.source(), value = %to_raw_string(entry.value()), "property");
    }

    fn visit_child(&mut self, layer: Option<Layer>, name: &str, source: &dyn PropertySource) {
        info!(
            source = name,
            layer = layer.map_or("-", |l| l.name()),
            keys = source.keys().len(),
            "source"
        );
    }
}

/// Collects a plain-text report, one line per visited item.
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use strata_config::{DescribeVisitor, Layer, LayeredConfig, MapSource};
///
/// let config = LayeredConfig::new("app");
/// config.add_source(
///     Layer::DEFAULTS,
///     "defaults",
///     Arc::new(MapSource::from_pairs([("port", json!(80))])),
/// )?;
/// let mut report = DescribeVisitor::default();
/// config.accept_keys(&mut report);
/// assert_eq!(report.finish(), "port = 80 (defaults)\n");
/// # Ok::<_, std::sync::Arc<strata_config::StrataError>>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct DescribeVisitor {
    report: String,
}

impl DescribeVisitor {
    /// Returns the collected report.
    #[must_use]
    pub fn finish(self) -> String {
        self.report
    }
}

impl ConfigVisitor for DescribeVisitor {
    fn visit_key(&mut self, key: &str, entry: &ResolvedEntry) {
        self.report.push_str(&format!(
            "{key} = {} ({})\n",
            to_raw_string(entry.value()),
            entry.source()
        ));
    }

    fn visit_child(&mut self, layer: Option<Layer>, name: &str, source: &dyn PropertySource) {
        let tier = layer.map_or_else(|| "-".to_owned(), |l| l.to_string());
        self.report
            .push_str(&format!("{tier} {name} [{} keys]\n", source.keys().len()));
    }
}
