//! Response bodies that are either still streaming or fully buffered.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream, StreamExt};

use super::error::{BodyError, BoxError};

/// An HTTP message body.
///
/// A body starts life either buffered (already in memory, re-readable any
/// number of times) or streaming (a one-shot byte stream owned by the
/// transport). Dropping a streaming body releases the underlying connection.
///
/// An optional size limit bounds how many bytes a read may buffer; it is
/// enforced on every read path regardless of how the body was constructed.
pub struct Body {
    kind: Kind,
    limit: Option<u64>,
}

enum Kind {
    Buffered(Bytes),
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl Body {
    /// Creates an empty, buffered body.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            kind: Kind::Buffered(Bytes::new()),
            limit: None,
        }
    }

    /// Creates a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            kind: Kind::Buffered(bytes.into()),
            limit: None,
        }
    }

    /// Creates a one-shot streaming body.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            kind: Kind::Stream(stream.map(|chunk| chunk.map_err(Into::into)).boxed()),
            limit: None,
        }
    }

    /// Bounds the number of bytes any read of this body may buffer.
    ///
    /// When a limit is already present the smaller one wins.
    #[must_use]
    pub fn limited(mut self, limit: u64) -> Self {
        self.limit = Some(self.limit.map_or(limit, |current| current.min(limit)));
        self
    }

    /// Returns the size limit applied to reads, if any.
    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Returns true if the body is already in memory.
    #[must_use]
    pub const fn is_buffered(&self) -> bool {
        matches!(self.kind, Kind::Buffered(_))
    }

    /// Returns the buffered bytes, or `None` while the body is still a stream.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match &self.kind {
            Kind::Buffered(bytes) => Some(bytes),
            Kind::Stream(_) => None,
        }
    }

    /// Reads the whole body into memory, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::TooLarge`] when the body exceeds the limit and
    /// [`BodyError::Read`] when the underlying stream fails.
    pub async fn collect(self) -> Result<Bytes, BodyError> {
        let limit = self.limit;
        match self.kind {
            Kind::Buffered(bytes) => {
                check_limit(bytes.len(), limit)?;
                Ok(bytes)
            }
            Kind::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(BodyError::Read)?;
                    check_limit(buf.len() + chunk.len(), limit)?;
                    buf.extend_from_slice(&chunk);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Reads the body into memory and replaces it with a re-readable buffer.
    ///
    /// Returns a cheap clone of the buffered bytes. Calling this on an
    /// already buffered body does not copy.
    ///
    /// # Errors
    ///
    /// Same as [`Body::collect`]. On error the body is left empty.
    pub async fn materialize(&mut self) -> Result<Bytes, BodyError> {
        let limit = self.limit;
        let body = std::mem::replace(self, Self::empty());
        let bytes = body.collect().await?;
        *self = Self {
            kind: Kind::Buffered(bytes.clone()),
            limit,
        };
        Ok(bytes)
    }
}

fn check_limit(len: usize, limit: Option<u64>) -> Result<(), BodyError> {
    match limit {
        Some(limit) if len as u64 > limit => Err(BodyError::TooLarge { limit }),
        _ => Ok(()),
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Body");
        match &self.kind {
            Kind::Buffered(bytes) => debug.field("buffered", &bytes.len()),
            Kind::Stream(_) => debug.field("stream", &"..."),
        };
        debug.field("limit", &self.limit).finish()
    }
}
