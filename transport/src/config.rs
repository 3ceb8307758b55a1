use http::uri::{Authority, Scheme};
use http::Uri;
use searchgate_aws_v4::{SERVICE_SERVERLESS, SERVICE_STANDARD};
use searchgate_core::utils::Redact;
use searchgate_core::{Error, Result};
use serde::Deserialize;
use std::fmt::{self, Debug};

/// Authentication mode of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Plain HTTP without credentials.
    Anonymous,
    /// HTTPS with optional username/password scoped to the target host.
    BasicAuthTls,
    /// HTTPS to a cloud endpoint with AWS SigV4 request signing.
    CloudSignature,
}

/// Connection settings for one session.
///
/// Exactly one [`AuthMode`] is active; fields that don't apply to it stay unset.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Active authentication mode.
    pub auth_mode: AuthMode,
    /// Cluster host for `Anonymous` and `BasicAuthTls`.
    pub host: String,
    /// Cluster port for `Anonymous` and `BasicAuthTls`.
    pub port: u16,
    /// `http` or `https`.
    pub scheme: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Skip certificate validation.
    pub trust_all_certificates: bool,
    /// Cloud endpoint for `CloudSignature`, usually a bare host name.
    pub cloud_endpoint: Option<String>,
    /// Signing service name, detected from the endpoint when unset.
    pub service_name: Option<String>,
    /// Signing region, resolved from the AWS environment when unset.
    pub region: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            auth_mode: AuthMode::Anonymous,
            host: "localhost".to_string(),
            port: 9200,
            scheme: "http".to_string(),
            username: None,
            password: None,
            trust_all_certificates: false,
            cloud_endpoint: None,
            service_name: None,
            region: None,
        }
    }
}

impl Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("auth_mode", &self.auth_mode)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &Redact::from(&self.password))
            .field("trust_all_certificates", &self.trust_all_certificates)
            .field("cloud_endpoint", &self.cloud_endpoint)
            .field("service_name", &self.service_name)
            .field("region", &self.region)
            .finish()
    }
}

impl TransportConfig {
    /// Plain HTTP to `host:port`.
    pub fn anonymous(host: &str, port: u16) -> Self {
        Self {
            auth_mode: AuthMode::Anonymous,
            host: host.to_string(),
            port,
            scheme: "http".to_string(),
            ..Default::default()
        }
    }

    /// HTTPS to `host:port`, authenticated when both username and password are given.
    pub fn basic_auth_tls(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        trust_all_certificates: bool,
    ) -> Self {
        Self {
            auth_mode: AuthMode::BasicAuthTls,
            host: host.to_string(),
            port,
            scheme: "https".to_string(),
            username: username.map(|v| v.to_string()),
            password: password.map(|v| v.to_string()),
            trust_all_certificates,
            ..Default::default()
        }
    }

    /// SigV4 signed HTTPS to a cloud endpoint on port 443.
    pub fn cloud_signature(endpoint: &str) -> Self {
        Self {
            auth_mode: AuthMode::CloudSignature,
            host: String::new(),
            port: 443,
            scheme: "https".to_string(),
            cloud_endpoint: Some(endpoint.to_string()),
            ..Default::default()
        }
    }

    /// Set the signing service name instead of detecting it.
    pub fn with_service_name(mut self, service: &str) -> Self {
        self.service_name = Some(service.to_string());
        self
    }

    /// Set the signing region instead of resolving it.
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Username and password, only when both are present.
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) => Some((u, p)),
            _ => None,
        }
    }

    /// Check that the fields needed by the active mode are present.
    pub fn validate(&self) -> Result<()> {
        match self.auth_mode {
            AuthMode::Anonymous | AuthMode::BasicAuthTls => {
                if self.host.trim().is_empty() {
                    return Err(Error::config_invalid("host is required"));
                }
                if self.port == 0 {
                    return Err(Error::config_invalid("port must not be 0"));
                }
                let expected = if self.auth_mode == AuthMode::Anonymous {
                    "http"
                } else {
                    "https"
                };
                if !self.scheme.eq_ignore_ascii_case(expected) {
                    return Err(Error::config_invalid(format!(
                        "{:?} requires scheme {expected}, got {}",
                        self.auth_mode, self.scheme
                    )));
                }
            }
            AuthMode::CloudSignature => {
                if self
                    .cloud_endpoint
                    .as_deref()
                    .map_or(true, |v| v.trim().is_empty())
                {
                    return Err(Error::config_invalid("cloud endpoint is required"));
                }
                if let Some(service) = self.service_name.as_deref() {
                    if service != SERVICE_SERVERLESS && service != SERVICE_STANDARD {
                        return Err(Error::config_invalid(format!(
                            "service name must be {SERVICE_SERVERLESS} or {SERVICE_STANDARD}, got {service}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Base uri every request of this session is resolved against.
    ///
    /// Default ports are left out so the uri matches the `Host` header the
    /// client sends.
    pub fn base_uri(&self) -> Result<Uri> {
        let (scheme, host, port) = match self.auth_mode {
            AuthMode::Anonymous | AuthMode::BasicAuthTls => (
                self.scheme.to_ascii_lowercase(),
                self.host.trim().to_string(),
                self.port,
            ),
            AuthMode::CloudSignature => {
                let endpoint = self.cloud_endpoint.as_deref().unwrap_or_default().trim();
                cloud_endpoint_parts(endpoint)?
            }
        };

        let scheme = Scheme::try_from(scheme.as_str())?;
        let default_port = if scheme == Scheme::HTTPS { 443 } else { 80 };
        let authority = if port == default_port {
            Authority::try_from(host.as_str())?
        } else {
            Authority::try_from(format!("{host}:{port}").as_str())?
        };

        Ok(Uri::builder()
            .scheme(scheme)
            .authority(authority)
            .path_and_query("/")
            .build()?)
    }
}

/// Split a cloud endpoint into scheme, host and port.
///
/// A bare host means `https` on 443. An explicit scheme or port is honored,
/// which lets local proxies stand in for the cloud endpoint.
fn cloud_endpoint_parts(endpoint: &str) -> Result<(String, String, u16)> {
    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("https".to_string(), endpoint),
    };
    let authority = rest.split(['/', '?']).next().unwrap_or(rest);
    let default_port = if scheme == "https" { 443 } else { 80 };

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|e| {
                Error::config_invalid(format!("invalid port in cloud endpoint {endpoint}"))
                    .with_source(e)
            })?;
            Ok((scheme, host.to_string(), port))
        }
        None => Ok((scheme, authority.to_string(), default_port)),
    }
}
