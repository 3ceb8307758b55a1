//! AWS SigV4 signing for search cluster requests.
//!
//! This crate signs requests bound for managed search domains (`es`) and
//! serverless collections (`aoss`):
//!
//! - [`RequestSigner`] computes the SigV4 `Authorization` header over the
//!   exact payload bytes that will be sent.
//! - [`DefaultCredentialProvider`] resolves credentials from the environment,
//!   the shared AWS files, STS web identity, the container credentials
//!   endpoint and EC2 instance metadata.
//! - [`DefaultRegionProvider`] resolves the region from the environment, the
//!   shared config file and EC2 instance metadata.
//! - [`detect_service`] maps an endpoint to its signing service name.
//!
//! ```no_run
//! use searchgate_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use searchgate_core::{Context, OsEnv, Signer};
//! use searchgate_file_read_tokio::TokioFileRead;
//! use searchgate_http_send_reqwest::ReqwestHttpSend;
//!
//! # async fn example() -> searchgate_core::Result<()> {
//! let ctx = Context::new()
//!     .with_file_read(TokioFileRead)
//!     .with_http_send(ReqwestHttpSend::default())
//!     .with_env(OsEnv);
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(),
//!     RequestSigner::new("es", "us-east-1"),
//! )
//! .await?;
//!
//! let payload = br#"{"query":"SELECT 1"}"#;
//! let (mut parts, _) = http::Request::post("https://search-demo.us-east-1.es.amazonaws.com/_plugins/_sql")
//!     .header("x-amz-content-sha256", "required")
//!     .body(())?
//!     .into_parts();
//! signer.sign(&mut parts, Some(&payload[..])).await?;
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::{
    AWS_CONFIG_FILE, AWS_DEFAULT_REGION, AWS_PROFILE, AWS_REGION, AWS_SHARED_CREDENTIALS_FILE,
    CONTENT_SHA_256_REQUIRED, SERVICE_SERVERLESS, SERVICE_STANDARD, X_AMZ_CONTENT_SHA_256,
};

mod credential;
pub use credential::Credential;

mod imds;

mod profile_file;

mod provide_credential;
pub use provide_credential::*;

mod region;
pub use region::DefaultRegionProvider;

mod service;
pub use service::{detect_service, endpoint_host};

mod sign_request;
pub use sign_request::RequestSigner;

#[cfg(test)]
mod test_server;
