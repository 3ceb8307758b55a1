//! Request pipeline stages.
//!
//! Interceptors run in a fixed order for every request: uri rewrite, basic
//! auth, diagnostics, then signing. Signing runs last so that it covers the
//! final uri and headers.

use crate::Exchange;
use async_trait::async_trait;
use searchgate_core::Result;
use std::fmt::Debug;

mod uri_rewrite;
pub use uri_rewrite::{UriRewriteInterceptor, CORRECTED_SHOW_URI, PROBLEMATIC_SHOW_URI};

mod basic_auth;
pub use basic_auth::BasicAuthInterceptor;

mod diagnostic;
pub use diagnostic::{DiagnosticInterceptor, RequestRecord};

mod sigv4;
pub use sigv4::SigV4Interceptor;

/// A stage of the request pipeline.
#[async_trait]
pub trait Interceptor: Debug + Send + Sync + 'static {
    /// Inspect or modify the request before it is sent.
    ///
    /// An error fails this request only.
    async fn intercept(&self, exchange: &mut Exchange) -> Result<()>;
}
