//! Typed decoding of interpolated property text.
//!
//! Decoding happens after interpolation: a consumer first resolves a value
//! to a string and then hands it to a converter. The set of supported target
//! types is a closed [`DecoderRegistry`] populated up front; asking for a
//! type that was never registered is a configuration error rather than a
//! best-effort guess.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::{StrataError, StrataResult};

const TRUE_TOKENS: [&str; 3] = ["true", "yes", "on"];
const FALSE_TOKENS: [&str; 3] = ["false", "no", "off"];

/// Parses `true/yes/on` and `false/no/off`, ignoring ASCII case.
///
/// # Errors
///
/// Returns a diagnostic message for any other token.
///
/// # Examples
///
/// ```
/// use strata_config::decode::parse_bool;
///
/// assert_eq!(parse_bool("Yes"), Ok(true));
/// assert_eq!(parse_bool("OFF"), Ok(false));
/// assert!(parse_bool("1").is_err());
/// ```
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    let token = raw.trim();
    if TRUE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
        Ok(true)
    } else if FALSE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
        Ok(false)
    } else {
        Err(format!(
            "expected one of true/yes/on or false/no/off, found '{token}'"
        ))
    }
}

/// Splits a comma-separated list, trimming entries and dropping empties.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses text through [`FromStr`], rendering the failure as a message.
///
/// # Errors
///
/// Returns the parser's error text.
pub fn parse_from_str<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| e.to_string())
}

fn parse_millis(raw: &str) -> Result<Duration, String> {
    parse_from_str::<u64>(raw).map(Duration::from_millis)
}

type Converter = Arc<dyn Fn(&str) -> Result<Box<dyn Any + Send + Sync>, String> + Send + Sync>;

#[derive(Clone)]
struct DecoderEntry {
    type_name: &'static str,
    convert: Converter,
}

/// Closed mapping from target type to converter function.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<TypeId, DecoderEntry>,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.decoders.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("types", &names)
            .finish()
    }
}

impl Default for DecoderRegistry {
    /// Registry pre-populated with strings, booleans, integers, floats,
    /// `char`, paths, millisecond [`Duration`]s and comma-separated
    /// `Vec<String>` lists.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register::<String, _>(|raw| Ok(raw.to_owned()))
            .register(parse_bool)
            .register(parse_from_str::<i8>)
            .register(parse_from_str::<i16>)
            .register(parse_from_str::<i32>)
            .register(parse_from_str::<i64>)
            .register(parse_from_str::<u8>)
            .register(parse_from_str::<u16>)
            .register(parse_from_str::<u32>)
            .register(parse_from_str::<u64>)
            .register(parse_from_str::<usize>)
            .register(parse_from_str::<f32>)
            .register(parse_from_str::<f64>)
            .register(parse_from_str::<char>)
            .register::<PathBuf, _>(|raw| Ok(PathBuf::from(raw.trim())))
            .register::<Utf8PathBuf, _>(|raw| Ok(Utf8PathBuf::from(raw.trim())))
            .register(parse_millis)
            .register(|raw| Ok(split_list(raw)));
        registry
    }
}

impl DecoderRegistry {
    /// Registry with no converters at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers (or replaces) the converter for `T`.
    pub fn register<T, F>(&mut self, convert: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let convert: Converter = Arc::new(move |raw: &str| {
            convert(raw).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
        });
        self.decoders.insert(
            TypeId::of::<T>(),
            DecoderEntry {
                type_name: type_name::<T>(),
                convert,
            },
        );
        self
    }

    /// Builder-style [`DecoderRegistry::register`].
    #[must_use]
    pub fn with<T, F>(mut self, convert: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.register(convert);
        self
    }

    /// Returns `true` when `T` has a converter.
    #[must_use]
    pub fn supports<T: Any>(&self) -> bool {
        self.decoders.contains_key(&TypeId::of::<T>())
    }

    /// Errors unless `T` has a converter.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownType`] for unregistered types.
    pub fn ensure_supported<T: Any>(&self) -> StrataResult<()> {
        if self.supports::<T>() {
            Ok(())
        } else {
            Err(Arc::new(StrataError::UnknownType {
                type_name: type_name::<T>(),
            }))
        }
    }

    /// Converts `raw`, the interpolated value of `key`, into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownType`] when `T` is not registered and
    /// [`StrataError::Decode`] when the converter rejects the text.
    pub fn decode<T: Any>(&self, key: &str, raw: &str) -> StrataResult<T> {
        let entry = self.decoders.get(&TypeId::of::<T>()).ok_or_else(|| {
            Arc::new(StrataError::UnknownType {
                type_name: type_name::<T>(),
            })
        })?;
        let decoded = (entry.convert)(raw).map_err(|message| {
            Arc::new(StrataError::Decode {
                key: key.to_owned(),
                value: raw.to_owned(),
                target: entry.type_name,
                message,
            })
        })?;
        decoded.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            Arc::new(StrataError::UnknownType {
                type_name: type_name::<T>(),
            })
        })
    }
}
