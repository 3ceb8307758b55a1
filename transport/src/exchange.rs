use bytes::Bytes;
use http::Method;
use searchgate_core::Body;

/// One request moving through the interceptor pipeline.
///
/// An exchange lives for exactly one send, so nothing stored on it can leak
/// into the next request.
#[derive(Debug)]
pub struct Exchange {
    /// Method, uri and headers.
    pub parts: http::request::Parts,
    /// Where the body lives for this request.
    pub entity: Entity,
}

/// Body placement of an [`Exchange`].
#[derive(Debug)]
pub enum Entity {
    /// The body is attached and readable by interceptors.
    Attached(Body),
    /// Only metadata is visible. `side_channel` holds the bytes the client will
    /// transmit, present for methods that carry a body.
    Detached {
        /// Body bytes for this request.
        side_channel: Option<Bytes>,
    },
}

impl Exchange {
    /// Whether this method may carry a body on the `Current` generation.
    pub fn method_carries_body(method: &Method) -> bool {
        method == Method::POST || method == Method::DELETE
    }

    /// Byte length of the body, when known without reading it.
    pub fn known_length(&self) -> Option<usize> {
        match &self.entity {
            Entity::Attached(body) => body.as_bytes().map(|bs| bs.len()),
            Entity::Detached { side_channel } => Some(side_channel.as_ref().map_or(0, |bs| bs.len())),
        }
    }
}
