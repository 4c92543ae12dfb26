//! Typed, interpolating accessors available on every [`PropertySource`].

use std::any::Any;
use std::sync::Arc;

use crate::decode::{DecoderRegistry, parse_bool, parse_from_str, split_list};
use crate::interpolate::{Interpolator, Lookup, StrInterpolator};
use crate::{StrataError, StrataResult, to_raw_string};

use super::PropertySource;

/// Adapts a [`PropertySource`] into a placeholder [`Lookup`].
///
/// Placeholders are resolved through [`PropertySource::lookup_placeholder`],
/// so views resolve `${...}` against their parent rather than themselves.
pub struct SourceLookup<'a, S: ?Sized>(&'a S);

impl<'a, S: PropertySource + ?Sized> SourceLookup<'a, S> {
    /// Wraps `source`.
    pub const fn new(source: &'a S) -> Self {
        Self(source)
    }
}

impl<S: PropertySource + ?Sized> Lookup for SourceLookup<'_, S> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.0.lookup_placeholder(key).map(|v| to_raw_string(&v))
    }
}

fn decode_with<T, F>(key: &str, raw: &str, target: &'static str, parse: F) -> StrataResult<T>
where
    F: FnOnce(&str) -> Result<T, String>,
{
    parse(raw).map_err(|message| {
        Arc::new(StrataError::Decode {
            key: key.to_owned(),
            value: raw.to_owned(),
            target,
            message,
        })
    })
}

/// Convenience reads layered over [`PropertySource::get_raw`].
///
/// Every accessor interpolates before decoding. Plain getters fail with
/// [`StrataError::NotFound`] for unbound keys; the `_or` variants fall back
/// to the supplied default only when the key is unbound, never when decoding
/// fails.
pub trait ConfigExt: PropertySource {
    /// Resolves placeholders in `template` against this source.
    ///
    /// # Errors
    ///
    /// Propagates interpolation failures.
    fn interpolate(&self, template: &str) -> StrataResult<String> {
        StrInterpolator::default().resolve(template, &SourceLookup::new(self))
    }

    /// Interpolated text for `key`, or `None` when unbound.
    ///
    /// # Errors
    ///
    /// Propagates interpolation failures.
    fn get_string_opt(&self, key: &str) -> StrataResult<Option<String>> {
        self.get_raw(key)
            .map(|raw| self.interpolate(&to_raw_string(&raw)))
            .transpose()
    }

    /// Interpolated text for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::NotFound`] when unbound, otherwise propagates
    /// interpolation failures.
    fn get_string(&self, key: &str) -> StrataResult<String> {
        self.get_string_opt(key)?
            .ok_or_else(|| StrataError::not_found(key))
    }

    /// Interpolated text for `key`, or `default` when unbound.
    ///
    /// # Errors
    ///
    /// Propagates interpolation failures.
    fn get_string_or(&self, key: &str, default: &str) -> StrataResult<String> {
        Ok(self
            .get_string_opt(key)?
            .unwrap_or_else(|| default.to_owned()))
    }

    /// Boolean read accepting `true/yes/on` and `false/no/off`.
    ///
    /// # Errors
    ///
    /// See [`ConfigExt::get_string`]; also [`StrataError::Decode`].
    fn get_bool(&self, key: &str) -> StrataResult<bool> {
        let raw = self.get_string(key)?;
        decode_with(key, &raw, "bool", parse_bool)
    }

    /// Boolean read with a default for unbound keys.
    ///
    /// # Errors
    ///
    /// Interpolation and decode failures.
    fn get_bool_or(&self, key: &str, default: bool) -> StrataResult<bool> {
        self.get_string_opt(key)?
            .map_or(Ok(default), |raw| decode_with(key, &raw, "bool", parse_bool))
    }

    /// Signed 32-bit read.
    ///
    /// # Errors
    ///
    /// See [`ConfigExt::get_string`]; also [`StrataError::Decode`].
    fn get_i32(&self, key: &str) -> StrataResult<i32> {
        let raw = self.get_string(key)?;
        decode_with(key, &raw, "i32", parse_from_str)
    }

    /// Signed 32-bit read with a default for unbound keys.
    ///
    /// # Errors
    ///
    /// Interpolation and decode failures.
    fn get_i32_or(&self, key: &str, default: i32) -> StrataResult<i32> {
        self.get_string_opt(key)?
            .map_or(Ok(default), |raw| decode_with(key, &raw, "i32", parse_from_str))
    }

    /// Signed 64-bit read.
    ///
    /// # Errors
    ///
    /// See [`ConfigExt::get_string`]; also [`StrataError::Decode`].
    fn get_i64(&self, key: &str) -> StrataResult<i64> {
        let raw = self.get_string(key)?;
        decode_with(key, &raw, "i64", parse_from_str)
    }

    /// Signed 64-bit read with a default for unbound keys.
    ///
    /// # Errors
    ///
    /// Interpolation and decode failures.
    fn get_i64_or(&self, key: &str, default: i64) -> StrataResult<i64> {
        self.get_string_opt(key)?
            .map_or(Ok(default), |raw| decode_with(key, &raw, "i64", parse_from_str))
    }

    /// Unsigned 64-bit read.
    ///
    /// # Errors
    ///
    /// See [`ConfigExt::get_string`]; also [`StrataError::Decode`].
    fn get_u64(&self, key: &str) -> StrataResult<u64> {
        let raw = self.get_string(key)?;
        decode_with(key, &raw, "u64", parse_from_str)
    }

    /// Unsigned 64-bit read with a default for unbound keys.
    ///
    /// # Errors
    ///
    /// Interpolation and decode failures.
    fn get_u64_or(&self, key: &str, default: u64) -> StrataResult<u64> {
        self.get_string_opt(key)?
            .map_or(Ok(default), |raw| decode_with(key, &raw, "u64", parse_from_str))
    }

    /// Floating-point read.
    ///
    /// # Errors
    ///
    /// See [`ConfigExt::get_string`]; also [`StrataError::Decode`].
    fn get_f64(&self, key: &str) -> StrataResult<f64> {
        let raw = self.get_string(key)?;
        decode_with(key, &raw, "f64", parse_from_str)
    }

    /// Floating-point read with a default for unbound keys.
    ///
    /// # Errors
    ///
    /// Interpolation and decode failures.
    fn get_f64_or(&self, key: &str, default: f64) -> StrataResult<f64> {
        self.get_string_opt(key)?
            .map_or(Ok(default), |raw| decode_with(key, &raw, "f64", parse_from_str))
    }

    /// Comma-separated list; an unbound key yields an empty list.
    ///
    /// # Errors
    ///
    /// Propagates interpolation failures.
    fn get_list(&self, key: &str) -> StrataResult<Vec<String>> {
        Ok(self
            .get_string_opt(key)?
            .map(|raw| split_list(&raw))
            .unwrap_or_default())
    }

    /// Decodes `key` through `decoders`.
    ///
    /// # Errors
    ///
    /// [`StrataError::UnknownType`] for unregistered targets, then the
    /// failures of [`ConfigExt::get_string`] and the decoder.
    fn get_decoded<T: Any>(&self, key: &str, decoders: &DecoderRegistry) -> StrataResult<T> {
        decoders.ensure_supported::<T>()?;
        let raw = self.get_string(key)?;
        decoders.decode(key, &raw)
    }
}

impl<S: PropertySource + ?Sized> ConfigExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapSource;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::time::Duration;

    #[fixture]
    fn source() -> MapSource {
        MapSource::from_pairs([
            ("host", json!("db.internal")),
            ("port", json!(5432)),
            ("url", json!("postgres://${host}:${port}")),
            ("debug", json!("Yes")),
            ("ratio", json!(0.5)),
            ("tags", json!(["a", "b"])),
            ("timeout", json!("${port}")),
            ("broken", json!("${missing}")),
        ])
    }

    #[rstest]
    fn string_reads_interpolate(source: MapSource) {
        assert_eq!(
            source.get_string("url").expect("url"),
            "postgres://db.internal:5432"
        );
        assert_eq!(source.get_i32("port").expect("port"), 5432);
        assert!(source.get_bool("debug").expect("debug"));
        assert_eq!(source.get_f64("ratio").expect("ratio").to_string(), "0.5");
        assert_eq!(source.get_list("tags").expect("tags"), vec!["a", "b"]);
    }

    #[rstest]
    fn defaults_apply_only_to_unbound_keys(source: MapSource) {
        assert_eq!(source.get_i64_or("absent", 7).expect("default"), 7);
        assert!(source.get_u64_or("host", 1).is_err());
        assert!(source.get_list("absent").expect("empty").is_empty());
    }

    #[rstest]
    fn missing_key_is_not_found(source: MapSource) {
        let err = source.get_string("absent").expect_err("missing");
        assert!(matches!(&*err, StrataError::NotFound { key } if key == "absent"));
    }

    #[rstest]
    fn unresolved_placeholder_surfaces(source: MapSource) {
        let err = source.get_string("broken").expect_err("strict");
        assert!(matches!(&*err, StrataError::UnresolvedPlaceholder { .. }));
    }

    #[rstest]
    fn decoded_reads_use_registry(source: MapSource) {
        let decoders = DecoderRegistry::default();
        assert_eq!(
            source
                .get_decoded::<Duration>("timeout", &decoders)
                .expect("duration"),
            Duration::from_millis(5432)
        );
    }
}
