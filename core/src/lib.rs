//! Core components shared by the searchgate crates.
//!
//! This crate holds the pieces every other searchgate crate builds on:
//!
//! - **Context**: a container for file reading, http sending and environment
//!   access, so that credential and configuration loading stay testable.
//! - **Traits**: [`ProvideCredential`] for resolving credentials and
//!   [`SignRequest`] for signing one outgoing request.
//! - **Signer**: resolves a credential once, caches it and drives a
//!   [`SignRequest`] implementation.
//! - **Body**: request bodies that are either replayable or single-read, with
//!   a way to turn the latter into the former.
//! - **Error**: the error type used across the workspace.
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use http::request::Parts;
//! use searchgate_core::{Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential};
//!
//! #[derive(Clone, Debug)]
//! struct Token(String);
//!
//! impl SigningCredential for Token {
//!     fn is_valid(&self) -> bool {
//!         !self.0.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct StaticToken;
//!
//! #[async_trait]
//! impl ProvideCredential for StaticToken {
//!     type Credential = Token;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
//!         Ok(Some(Token("secret".to_string())))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct BearerSigner;
//!
//! #[async_trait]
//! impl SignRequest for BearerSigner {
//!     type Credential = Token;
//!
//!     async fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut Parts,
//!         _: Option<&[u8]>,
//!         cred: Option<&Token>,
//!     ) -> Result<()> {
//!         if let Some(cred) = cred {
//!             req.headers
//!                 .insert(http::header::AUTHORIZATION, format!("Bearer {}", cred.0).parse()?);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), StaticToken, BearerSigner).await?;
//! let (mut parts, _) = http::Request::get("https://example.com").body(())?.into_parts();
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};

mod context;
pub use context::{
    Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend, OsEnv, StaticEnv,
};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;
mod body;
pub use body::Body;
