use super::Interceptor;
use crate::Exchange;
use async_trait::async_trait;
use http::uri::PathAndQuery;
use http::Uri;
use log::{debug, info};
use searchgate_core::Result;

/// The metadata listing the SQL plugin issues for `SHOW TABLES`, which
/// clusters reject.
pub const PROBLEMATIC_SHOW_URI: &str = "/?ignore_throttled=false&ignore_unavailable=false&expand_wildcards=open%2Cclosed&allow_no_indices=false&cluster_manager_timeout=30s";
/// Wildcard listing accepted in its place.
pub const CORRECTED_SHOW_URI: &str = "/*?";

/// Rewrites the metadata-listing uri. Every other uri passes through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct UriRewriteInterceptor;

#[async_trait]
impl Interceptor for UriRewriteInterceptor {
    async fn intercept(&self, exchange: &mut Exchange) -> Result<()> {
        let uri = &exchange.parts.uri;
        debug!("original uri: {uri}");

        if uri.path_and_query().map(|v| v.as_str()) != Some(PROBLEMATIC_SHOW_URI) {
            return Ok(());
        }

        let mut parts = std::mem::take(&mut exchange.parts.uri).into_parts();
        parts.path_and_query = Some(PathAndQuery::from_static(CORRECTED_SHOW_URI));
        exchange.parts.uri = Uri::from_parts(parts)?;
        info!("rewrote show uri to {}", exchange.parts.uri);
        Ok(())
    }
}
