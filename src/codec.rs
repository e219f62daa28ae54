//! Conversions between in-memory values and their stored string form.
//!
//! A codec is a serialize/deserialize pair. For a valid codec,
//! `deserialize(serialize(v))` yields a value equal to `v`.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// A serialize/deserialize pair for values of type `T`.
pub trait Codec<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Result<String, CodecError>;

    fn deserialize(&self, raw: &str) -> Result<T, CodecError>;
}

/// JSON encoding through `serde_json`. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn deserialize(&self, raw: &str) -> Result<T, CodecError> {
        serde_json::from_str(raw).map_err(|e| CodecError::Deserialize(e.to_string()))
    }
}

/// Stores strings verbatim, without quoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStringCodec;

impl Codec<String> for RawStringCodec {
    fn serialize(&self, value: &String) -> Result<String, CodecError> {
        Ok(value.clone())
    }

    fn deserialize(&self, raw: &str) -> Result<String, CodecError> {
        Ok(raw.to_string())
    }
}

/// A codec built from a pair of closures.
///
/// ```
/// use stowage::codec::{Codec, FnCodec};
/// use stowage::error::CodecError;
///
/// let codec = FnCodec::new(
///     |n: &u32| Ok(format!("#{n}")),
///     |raw: &str| {
///         raw.trim_start_matches('#')
///             .parse()
///             .map_err(|e: std::num::ParseIntError| CodecError::Deserialize(e.to_string()))
///     },
/// );
/// assert_eq!(codec.serialize(&7).unwrap(), "#7");
/// assert_eq!(codec.deserialize("#7").unwrap(), 7);
/// ```
pub struct FnCodec<T, S, D> {
    serialize: S,
    deserialize: D,
    _value: PhantomData<fn() -> T>,
}

impl<T, S, D> FnCodec<T, S, D>
where
    S: Fn(&T) -> Result<String, CodecError> + Send + Sync,
    D: Fn(&str) -> Result<T, CodecError> + Send + Sync,
{
    pub fn new(serialize: S, deserialize: D) -> Self {
        Self {
            serialize,
            deserialize,
            _value: PhantomData,
        }
    }
}

impl<T, S, D> Codec<T> for FnCodec<T, S, D>
where
    S: Fn(&T) -> Result<String, CodecError> + Send + Sync,
    D: Fn(&str) -> Result<T, CodecError> + Send + Sync,
{
    fn serialize(&self, value: &T) -> Result<String, CodecError> {
        (self.serialize)(value)
    }

    fn deserialize(&self, raw: &str) -> Result<T, CodecError> {
        (self.deserialize)(raw)
    }
}

impl<T, S, D> fmt::Debug for FnCodec<T, S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}
