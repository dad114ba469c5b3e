//! Codec Module
//!
//! Turns values into opaque payload bytes and back. The cache engine never
//! looks inside a payload; any serde-compatible format can sit behind [`Codec`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

// == Codec Error ==
/// Failure reported by a codec while encoding or decoding a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CodecError(pub String);

// == Codec Trait ==
/// Encode/decode pair used by the cache to store arbitrary values.
pub trait Codec: Send + Sync + 'static {
    /// Appends the encoded form of `value` to `buf`.
    ///
    /// `buf` arrives empty. On error its contents are unspecified and the
    /// caller discards them.
    fn encode<T>(&self, value: &T, buf: &mut Vec<u8>) -> Result<(), CodecError>
    where
        T: Serialize + ?Sized;

    /// Reconstructs a value from a payload produced by [`Codec::encode`].
    fn decode<T>(&self, payload: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned;
}

// == JSON Codec ==
/// Default codec backed by `serde_json`.
///
/// Fetching as [`serde_json::Value`] gives a schemaless view of any stored value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T>(&self, value: &T, buf: &mut Vec<u8>) -> Result<(), CodecError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_writer(buf, value).map_err(|e| CodecError(e.to_string()))
    }

    fn decode<T>(&self, payload: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(payload).map_err(|e| CodecError(e.to_string()))
    }
}
