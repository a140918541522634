use std::{fmt, io::Read};

use bytes::Bytes;
use serde::Serialize;

/// Object-safe JSON encoding, implemented for every `T: Serialize`.
///
/// Lets [`Body::Structured`] borrow arbitrary serializable values without
/// making `Body` generic.
pub trait ToJson {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + ?Sized> ToJson for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Request body source.
///
/// Converted into bytes by [`RequestOptions::set_body`](crate::RequestOptions::set_body):
/// raw bytes and text verbatim, streams fully drained, structured values as JSON.
#[derive(Default)]
pub enum Body<'a> {
    /// No body; setting it leaves the options untouched.
    #[default]
    Empty,
    Raw(Vec<u8>),
    Text(String),
    Stream(Box<dyn Read + Send + 'a>),
    Structured(&'a (dyn ToJson + Sync)),
}

impl<'a> Body<'a> {
    /// Borrows a serializable value to be encoded as JSON.
    pub fn json<T: Serialize + Sync>(value: &'a T) -> Self {
        Self::Structured(value)
    }

    /// Wraps a reader that is drained when the body is set.
    pub fn stream(reader: impl Read + Send + 'a) -> Self {
        Self::Stream(Box::new(reader))
    }
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Raw(bytes) => f.debug_tuple("Raw").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Structured(_) => f.write_str("Structured(..)"),
        }
    }
}

impl From<&str> for Body<'_> {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Body<'_> {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Body<'_> {
    fn from(value: Vec<u8>) -> Self {
        Self::Raw(value)
    }
}

impl From<&[u8]> for Body<'_> {
    fn from(value: &[u8]) -> Self {
        Self::Raw(value.to_vec())
    }
}

impl From<Bytes> for Body<'_> {
    fn from(value: Bytes) -> Self {
        Self::Raw(value.to_vec())
    }
}

impl<'a, B: Into<Body<'a>>> From<Option<B>> for Body<'a> {
    fn from(value: Option<B>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}
