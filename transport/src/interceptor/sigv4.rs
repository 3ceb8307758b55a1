use super::Interceptor;
use crate::{Entity, Exchange};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderValue;
use log::debug;
use searchgate_aws_v4::{Credential, CONTENT_SHA_256_REQUIRED, X_AMZ_CONTENT_SHA_256};
use searchgate_core::{Result, Signer};

/// Signs each request with AWS SigV4 over the bytes that will be transmitted.
///
/// Attached one-shot bodies are drained into memory first and put back as a
/// replayable body, so the signed and sent bytes are the same buffer.
/// Detached requests sign their side channel for `POST` and `DELETE`, and an
/// empty payload otherwise.
#[derive(Debug, Clone)]
pub struct SigV4Interceptor {
    signer: Signer<Credential>,
}

impl SigV4Interceptor {
    /// Create a new interceptor from a resolved signer.
    pub fn new(signer: Signer<Credential>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl Interceptor for SigV4Interceptor {
    async fn intercept(&self, exchange: &mut Exchange) -> Result<()> {
        let payload = match &mut exchange.entity {
            Entity::Attached(body) => {
                if !body.is_replayable() {
                    debug!("buffering single-read body before signing");
                }
                body.make_replayable().await?
            }
            Entity::Detached { side_channel } => {
                if Exchange::method_carries_body(&exchange.parts.method) {
                    side_channel.clone().unwrap_or_default()
                } else {
                    Bytes::new()
                }
            }
        };

        exchange
            .parts
            .headers
            .entry(X_AMZ_CONTENT_SHA_256)
            .or_insert(HeaderValue::from_static(CONTENT_SHA_256_REQUIRED));

        self.signer.sign(&mut exchange.parts, Some(&payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use searchgate_aws_v4::{RequestSigner, StaticCredentialProvider};
    use searchgate_core::hash::{hex_sha256, EMPTY_SHA256};
    use searchgate_core::{Body, Context};
    use std::io::Cursor;

    async fn interceptor() -> SigV4Interceptor {
        let signer = Signer::new(
            Context::new(),
            StaticCredentialProvider::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            RequestSigner::new("es", "us-east-1"),
        )
        .await
        .expect("signer must build");
        SigV4Interceptor::new(signer)
    }

    fn parts(method: http::Method) -> http::request::Parts {
        http::Request::builder()
            .method(method)
            .uri("https://search-logs.us-east-1.es.amazonaws.com/_plugins/_sql")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_one_shot_body_signed_and_replayable() -> Result<()> {
        let payload = b"{\"query\":\"SELECT * FROM logs\"}".to_vec();
        let mut ex = Exchange {
            parts: parts(http::Method::POST),
            entity: Entity::Attached(Body::from_reader(Cursor::new(payload.clone()))),
        };

        interceptor().await.intercept(&mut ex).await?;

        let Entity::Attached(body) = &ex.entity else {
            panic!("entity must stay attached");
        };
        assert_eq!(body.as_bytes().as_deref(), Some(&payload[..]));
        assert_eq!(ex.parts.headers[X_AMZ_CONTENT_SHA_256].to_str()?, hex_sha256(&payload));
        assert!(ex.parts.headers.contains_key(http::header::AUTHORIZATION));
        Ok(())
    }

    #[tokio::test]
    async fn test_side_channel_only_for_body_methods() -> Result<()> {
        let payload = Bytes::from_static(b"{\"query\":\"source=logs\"}");

        let mut ex = Exchange {
            parts: parts(http::Method::POST),
            entity: Entity::Detached {
                side_channel: Some(payload.clone()),
            },
        };
        interceptor().await.intercept(&mut ex).await?;
        assert_eq!(ex.parts.headers[X_AMZ_CONTENT_SHA_256].to_str()?, hex_sha256(&payload));

        let mut ex = Exchange {
            parts: parts(http::Method::GET),
            entity: Entity::Detached {
                side_channel: Some(payload),
            },
        };
        interceptor().await.intercept(&mut ex).await?;
        assert_eq!(ex.parts.headers[X_AMZ_CONTENT_SHA_256].to_str()?, EMPTY_SHA256);
        Ok(())
    }
}
