use log::debug;
use searchgate_core::{Context, Error, Result};
use searchgate_query::{EngineSettings, DEFAULT_QUERY_TIMEOUT};
use searchgate_transport::TransportGeneration;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Path of the TOML config file.
pub const SEARCHGATE_CONFIG: &str = "SEARCHGATE_CONFIG";
/// Bridge port override.
pub const SEARCHGATE_PORT: &str = "SEARCHGATE_PORT";
/// Query deadline override in seconds, `0` disables it.
pub const SEARCHGATE_QUERY_TIMEOUT: &str = "SEARCHGATE_QUERY_TIMEOUT";
/// Major version of the target cluster.
pub const SEARCHGATE_CLUSTER_MAJOR_VERSION: &str = "SEARCHGATE_CLUSTER_MAJOR_VERSION";

/// Gateway settings.
///
/// ```toml
/// listen_addr = "127.0.0.1"
/// port = 25333
/// query_timeout = 300
/// cluster_major_version = 3
///
/// [engine]
/// query_size_limit = 200
///
/// [engine.flags]
/// "plugins.calcite.enabled" = "true"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the bridge listens on.
    pub listen_addr: String,
    /// Port the bridge listens on.
    pub port: u16,
    /// Seconds to wait for a query outcome, `0` waits forever.
    pub query_timeout: u64,
    /// Major version of the cluster, selects the transport generation.
    pub cluster_major_version: u32,
    /// Settings handed to the query engine.
    pub engine: EngineSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 25333,
            query_timeout: DEFAULT_QUERY_TIMEOUT.as_secs(),
            cluster_major_version: 3,
            engine: EngineSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::config_invalid("failed to parse gateway config").with_source(e))
    }

    /// Load the file named by `SEARCHGATE_CONFIG`, then apply env overrides.
    pub async fn load(ctx: &Context) -> Result<Self> {
        let config = match ctx.env_var(SEARCHGATE_CONFIG).filter(|v| !v.is_empty()) {
            Some(path) => {
                debug!("loading gateway config from {path}");
                let path = ctx.expand_home_dir(&path).unwrap_or(path);
                let content = ctx.file_read_as_string(&path).await.map_err(|e| {
                    Error::config_invalid(format!("failed to read gateway config {path}"))
                        .with_source(e)
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.from_env(ctx)
    }

    /// Override fields from environment variables.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        if let Some(v) = env_parse(ctx, SEARCHGATE_PORT)? {
            self.port = v;
        }
        if let Some(v) = env_parse(ctx, SEARCHGATE_QUERY_TIMEOUT)? {
            self.query_timeout = v;
        }
        if let Some(v) = env_parse(ctx, SEARCHGATE_CLUSTER_MAJOR_VERSION)? {
            self.cluster_major_version = v;
        }
        Ok(self)
    }

    /// Deadline for one query, `None` when disabled.
    pub fn query_timeout(&self) -> Option<Duration> {
        match self.query_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn generation(&self) -> TransportGeneration {
        TransportGeneration::for_major_version(self.cluster_major_version)
    }

    pub fn listen_on(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}

fn env_parse<T>(ctx: &Context, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match ctx.env_var(key).filter(|v| !v.trim().is_empty()) {
        Some(v) => v.trim().parse().map(Some).map_err(|e| {
            Error::config_invalid(format!("invalid value for {key}: {v}")).with_source(e)
        }),
        None => Ok(None),
    }
}
