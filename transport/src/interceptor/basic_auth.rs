use super::Interceptor;
use crate::Exchange;
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::uri::Authority;
use http::HeaderValue;
use log::debug;
use searchgate_core::hash::base64_encode;
use searchgate_core::utils::Redact;
use searchgate_core::Result;
use std::fmt::{self, Debug};

/// Adds basic credentials to requests bound for one `host:port`.
///
/// Requests to any other authority go out without credentials.
#[derive(Clone)]
pub struct BasicAuthInterceptor {
    host: String,
    port: u16,
    username: String,
    header: HeaderValue,
}

impl Debug for BasicAuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthInterceptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &Redact::from(&self.username))
            .finish_non_exhaustive()
    }
}

impl BasicAuthInterceptor {
    /// Scope `username:password` to `host:port`.
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let mut header =
            HeaderValue::from_str(&format!("Basic {}", base64_encode(format!("{username}:{password}").as_bytes())))?;
        header.set_sensitive(true);

        Ok(Self {
            host: host.trim().to_ascii_lowercase(),
            port,
            username: username.to_string(),
            header,
        })
    }

    fn in_scope(&self, authority: Option<&Authority>, https: bool) -> bool {
        let Some(authority) = authority else {
            return false;
        };
        let port = authority
            .port_u16()
            .unwrap_or(if https { 443 } else { 80 });
        authority.host().eq_ignore_ascii_case(&self.host) && port == self.port
    }
}

#[async_trait]
impl Interceptor for BasicAuthInterceptor {
    async fn intercept(&self, exchange: &mut Exchange) -> Result<()> {
        let uri = &exchange.parts.uri;
        let https = uri.scheme() == Some(&http::uri::Scheme::HTTPS);
        if !self.in_scope(uri.authority(), https) {
            debug!("{uri} is outside the basic auth scope, skipped");
            return Ok(());
        }

        exchange
            .parts
            .headers
            .insert(AUTHORIZATION, self.header.clone());
        Ok(())
    }
}
