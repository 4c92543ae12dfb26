//! Figment-backed reader for configuration files on disk.

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
#[cfg(any(feature = "toml", feature = "json5"))]
use figment::providers::Format;
#[cfg(feature = "toml")]
use figment::providers::Toml;
#[cfg(feature = "json5")]
use figment_json5::Json5;
use tracing::debug;

use super::ConfigReader;
#[cfg(feature = "yaml")]
use super::yaml::SaphyrYaml;
use crate::value::flatten_into;
use crate::{ResourceResultExt, StrataError, StrataResult, Value};

/// File extensions tried for each resource name, in order.
fn extensions() -> Vec<&'static str> {
    let mut extensions = Vec::new();
    #[cfg(feature = "toml")]
    extensions.push("toml");
    #[cfg(feature = "json5")]
    extensions.extend(["json", "json5"]);
    #[cfg(feature = "yaml")]
    extensions.extend(["yaml", "yml"]);
    extensions
}

/// Parses `data` according to the extension of `path`.
///
/// TOML is validated before figment sees it so syntax errors name the file.
fn parse_by_format(path: &Utf8Path, data: &str) -> StrataResult<Figment> {
    let ext = path.extension().map(str::to_ascii_lowercase);
    let figment = match ext.as_deref() {
        #[cfg(feature = "toml")]
        Some("toml") => {
            toml::from_str::<toml::Value>(data).for_resource(path.as_str())?;
            Figment::from(Toml::string(data))
        }
        #[cfg(feature = "json5")]
        Some("json" | "json5") => Figment::from(Json5::string(data)),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => Figment::from(SaphyrYaml::string(path, data)),
        other => {
            return Err(StrataError::resource(
                path.as_str(),
                io::Error::other(format!(
                    "unsupported configuration format '{}'",
                    other.unwrap_or("")
                )),
            ));
        }
    };
    Ok(figment)
}

/// Reads `path` into a figment, choosing the format from its extension.
pub(crate) fn read_figment(path: &Utf8Path) -> StrataResult<Figment> {
    let data = std::fs::read_to_string(path).for_resource(path.as_str())?;
    parse_by_format(path, &data)
}

/// Loads `<dir>/<resource>.<ext>` from a list of search directories.
///
/// The first existing file wins. Nested tables are flattened to dotted keys;
/// arrays are kept as structured values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReader {
    search_paths: Vec<Utf8PathBuf>,
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new(["."])
    }
}

impl FileReader {
    /// Reader searching `search_paths` in order.
    #[must_use]
    pub fn new<I, P>(search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Directories searched, in order.
    #[must_use]
    pub fn search_paths(&self) -> &[Utf8PathBuf] {
        &self.search_paths
    }

    fn candidates<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = Utf8PathBuf> + 'a {
        let extensions = extensions();
        self.search_paths.iter().flat_map(move |dir| {
            extensions
                .clone()
                .into_iter()
                .map(move |ext| dir.join(format!("{resource}.{ext}")))
        })
    }

    fn locate(&self, resource: &str) -> Option<Utf8PathBuf> {
        self.candidates(resource).find(|path| path.is_file())
    }
}

impl ConfigReader for FileReader {
    fn can_load(&self, resource: &str) -> bool {
        self.locate(resource).is_some()
    }

    fn load(&self, resource: &str) -> StrataResult<BTreeMap<String, Value>> {
        let path = self.locate(resource).ok_or_else(|| {
            std::sync::Arc::new(StrataError::MissingResource {
                resource: resource.to_owned(),
            })
        })?;
        let tree: Value = read_figment(&path)?
            .extract()
            .for_resource(path.as_str())?;
        let mut values = BTreeMap::new();
        flatten_into("", tree, &mut values);
        debug!(resource, path = %path, keys = values.len(), "loaded configuration file");
        Ok(values)
    }
}
