//! In-memory resources.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::ConfigReader;
use crate::{StrataError, StrataResult, Value};

/// Serves resources registered up front, for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct MapReader {
    resources: HashMap<String, BTreeMap<String, Value>>,
}

impl MapReader {
    /// A reader with no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `values` under `resource`.
    #[must_use]
    pub fn with_resource<K, V, I>(mut self, resource: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.resources.insert(
            resource.into(),
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }
}

impl ConfigReader for MapReader {
    fn can_load(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    fn load(&self, resource: &str) -> StrataResult<BTreeMap<String, Value>> {
        self.resources.get(resource).cloned().ok_or_else(|| {
            Arc::new(StrataError::MissingResource {
                resource: resource.to_owned(),
            })
        })
    }
}
