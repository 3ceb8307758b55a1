use super::Interceptor;
use crate::{Entity, Exchange};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use log::{debug, info};
use searchgate_core::utils::{is_sensitive_header, Redact};
use searchgate_core::{Error, Result};
use std::sync::Mutex;

/// What the diagnostic interceptor saw of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Request method.
    pub method: String,
    /// Request uri.
    pub uri: String,
    /// Headers in order, sensitive values redacted.
    pub headers: Vec<(String, String)>,
    /// Content type of an attached body.
    pub content_type: Option<String>,
    /// Length of the body when it is known without reading it.
    pub content_length: Option<usize>,
}

/// Logs every request and keeps the last one for inspection.
#[derive(Debug)]
pub struct DiagnosticInterceptor {
    protocol: &'static str,
    last: Mutex<Option<RequestRecord>>,
}

impl DiagnosticInterceptor {
    /// Create an interceptor that labels requests as HTTP or HTTPS.
    pub fn new(https: bool) -> Self {
        Self {
            protocol: if https { "HTTPS" } else { "HTTP" },
            last: Mutex::new(None),
        }
    }

    /// The most recent request that passed through.
    pub fn last_request(&self) -> Option<RequestRecord> {
        self.last.lock().ok().and_then(|v| v.clone())
    }
}

#[async_trait]
impl Interceptor for DiagnosticInterceptor {
    async fn intercept(&self, exchange: &mut Exchange) -> Result<()> {
        let parts = &exchange.parts;
        let headers = parts
            .headers
            .iter()
            .map(|(k, v)| {
                let value = String::from_utf8_lossy(v.as_bytes()).to_string();
                let value = if v.is_sensitive() || is_sensitive_header(k.as_str()) {
                    format!("{:?}", Redact::from(&value))
                } else {
                    value
                };
                (k.as_str().to_string(), value)
            })
            .collect::<Vec<_>>();

        let (content_type, content_length) = match &exchange.entity {
            Entity::Attached(_) => (
                parts
                    .headers
                    .get(CONTENT_TYPE)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string()),
                exchange.known_length(),
            ),
            Entity::Detached { .. } => (None, exchange.known_length()),
        };

        info!("===== {} REQUEST =====", self.protocol);
        info!("Method: {}", parts.method);
        info!("URI: {}", parts.uri);
        for (name, value) in &headers {
            debug!("{name}: {value}");
        }
        if let Some(content_type) = &content_type {
            debug!("Content-Type: {content_type}, Content-Length: {content_length:?}");
        }

        let record = RequestRecord {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            headers,
            content_type,
            content_length,
        };
        *self
            .last
            .lock()
            .map_err(|_| Error::unexpected("diagnostic record lock poisoned"))? = Some(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use searchgate_core::Body;

    #[tokio::test]
    async fn test_records_and_redacts() -> Result<()> {
        let (parts, _) = http::Request::post("https://search.internal:9200/_plugins/_sql")
            .header("content-type", "application/json")
            .header("authorization", "Basic YWRtaW46YWRtaW4=")
            .body(())?
            .into_parts();
        let mut ex = Exchange {
            parts,
            entity: Entity::Attached(Body::from("{\"query\":\"select 1\"}")),
        };

        let interceptor = DiagnosticInterceptor::new(true);
        assert_eq!(interceptor.last_request(), None);
        interceptor.intercept(&mut ex).await?;

        let record = interceptor.last_request().expect("request must be recorded");
        assert_eq!(record.method, "POST");
        assert_eq!(record.uri, "https://search.internal:9200/_plugins/_sql");
        assert_eq!(record.content_type.as_deref(), Some("application/json"));
        assert_eq!(record.content_length, Some(20));
        assert_eq!(
            record.headers,
            vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("authorization".to_string(), "Bas***W4=".to_string()),
            ]
        );
        Ok(())
    }
}
