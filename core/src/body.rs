use crate::Result;
use bytes::Bytes;
use std::fmt::{self, Debug};
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Body of an outgoing request.
///
/// A body is either replayable (its bytes can be read any number of times) or
/// one-shot (a stream that can be consumed once). Signing needs the payload
/// bytes before they are transmitted, so one-shot bodies are drained with
/// [`Body::make_replayable`] first.
#[derive(Default)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// A replayable body.
    Bytes(Bytes),
    /// A single-read body.
    OneShot(Pin<Box<dyn AsyncRead + Send + Sync>>),
}

impl Body {
    /// Wrap a reader as a single-read body.
    pub fn from_reader(r: impl AsyncRead + Send + Sync + 'static) -> Self {
        Body::OneShot(Box::pin(r))
    }

    /// Returns true if the body can be read more than once.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, Body::OneShot(_))
    }

    /// Returns the buffered bytes of a replayable body.
    ///
    /// `Empty` yields an empty buffer, `OneShot` yields `None`.
    pub fn as_bytes(&self) -> Option<Bytes> {
        match self {
            Body::Empty => Some(Bytes::new()),
            Body::Bytes(bs) => Some(bs.clone()),
            Body::OneShot(_) => None,
        }
    }

    /// Drain a one-shot body into memory and replace it with a replayable body
    /// holding the same bytes.
    ///
    /// Returns the bytes that will be transmitted. Replayable bodies are left
    /// untouched.
    pub async fn make_replayable(&mut self) -> Result<Bytes> {
        let bs = match self {
            Body::Empty => return Ok(Bytes::new()),
            Body::Bytes(bs) => return Ok(bs.clone()),
            Body::OneShot(r) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf).await?;
                Bytes::from(buf)
            }
        };

        *self = Body::Bytes(bs.clone());
        Ok(bs)
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bs) => write!(f, "Bytes({} bytes)", bs.len()),
            Body::OneShot(_) => f.write_str("OneShot"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bs: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bs))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}
