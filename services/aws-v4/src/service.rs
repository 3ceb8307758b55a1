use crate::constants::{SERVICE_SERVERLESS, SERVICE_STANDARD};
use searchgate_core::{Error, Result};

/// Detect the signing service name from a cluster endpoint.
///
/// Serverless collections live under `*.aoss.amazonaws.com`, managed domains
/// under `*.es.amazonaws.com`. The serverless marker is checked first since
/// the two overlap.
pub fn detect_service(endpoint: &str) -> Result<&'static str> {
    let host = endpoint_host(endpoint).to_ascii_lowercase();

    if host.contains("aos") {
        Ok(SERVICE_SERVERLESS)
    } else if host.contains("es") {
        Ok(SERVICE_STANDARD)
    } else {
        Err(Error::config_invalid(format!(
            "cannot determine service type from endpoint {endpoint}"
        )))
    }
}

/// Strip scheme, path and port from an endpoint, leaving the host name.
pub fn endpoint_host(endpoint: &str) -> &str {
    let rest = endpoint
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(endpoint);
    let authority = rest.split(['/', '?']).next().unwrap_or(rest);
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}
