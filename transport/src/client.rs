use crate::interceptor::{DiagnosticInterceptor, Interceptor, RequestRecord};
use crate::{Entity, Exchange, TransportGeneration};
use bytes::Bytes;
use http::uri::PathAndQuery;
use http::Uri;
use log::debug;
use searchgate_core::{Body, Error, Result};
use std::str::FromStr;
use std::sync::Arc;

/// A ready-to-use client for one cluster session.
///
/// Built by [`TransportFactory`](crate::TransportFactory). Cheap to clone, all
/// clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    generation: TransportGeneration,
    base_uri: Uri,
    http: reqwest::Client,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    diagnostic: Arc<DiagnosticInterceptor>,
}

impl Client {
    pub(crate) fn new(
        generation: TransportGeneration,
        base_uri: Uri,
        http: reqwest::Client,
        interceptors: Vec<Arc<dyn Interceptor>>,
        diagnostic: Arc<DiagnosticInterceptor>,
    ) -> Self {
        Self {
            generation,
            base_uri,
            http,
            interceptors: Arc::new(interceptors),
            diagnostic,
        }
    }

    /// The generation this client was built for.
    pub fn generation(&self) -> TransportGeneration {
        self.generation
    }

    /// The uri requests are resolved against.
    pub fn base_uri(&self) -> &Uri {
        &self.base_uri
    }

    /// Resolve a path and query against the base uri.
    pub fn uri(&self, path_and_query: &str) -> Result<Uri> {
        let mut parts = self.base_uri.clone().into_parts();
        parts.path_and_query = Some(PathAndQuery::from_str(path_and_query)?);
        Ok(Uri::from_parts(parts)?)
    }

    /// The last request seen by the diagnostic stage.
    pub fn last_request(&self) -> Option<RequestRecord> {
        self.diagnostic.last_request()
    }

    /// Run the request through the pipeline and send it.
    ///
    /// Non-2xx responses are returned as responses, not errors.
    pub async fn send(&self, req: http::Request<Body>) -> Result<http::Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let mut exchange = self.exchange(parts, body).await?;

        for interceptor in self.interceptors.iter() {
            interceptor.intercept(&mut exchange).await?;
        }

        let Exchange { parts, entity } = exchange;
        let payload = match entity {
            Entity::Attached(mut body) => body.make_replayable().await?,
            Entity::Detached { side_channel } => side_channel.unwrap_or_default(),
        };

        let req = reqwest::Request::try_from(http::Request::from_parts(parts, payload))
            .map_err(|e| Error::request_invalid("failed to build http request").with_source(e))?;
        debug!("sending {} {}", req.method(), req.url());

        let resp = self
            .http
            .execute(req)
            .await
            .map_err(|e| Error::unexpected("failed to send http request").with_source(e))?;

        let mut builder = http::Response::builder()
            .status(resp.status())
            .version(resp.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(resp.headers().clone());
        }
        let bs = resp
            .bytes()
            .await
            .map_err(|e| Error::unexpected("failed to read http response").with_source(e))?;
        Ok(builder.body(bs)?)
    }

    /// Place the body according to the generation.
    async fn exchange(&self, parts: http::request::Parts, mut body: Body) -> Result<Exchange> {
        let entity = match self.generation {
            TransportGeneration::Legacy => Entity::Attached(body),
            TransportGeneration::Current => {
                let bs = body.make_replayable().await?;
                if Exchange::method_carries_body(&parts.method) {
                    Entity::Detached {
                        side_channel: Some(bs),
                    }
                } else if bs.is_empty() {
                    Entity::Detached { side_channel: None }
                } else {
                    return Err(Error::request_invalid(format!(
                        "{} requests can't carry a body on this transport",
                        parts.method
                    )));
                }
            }
        };

        Ok(Exchange { parts, entity })
    }
}
