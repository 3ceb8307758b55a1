use crate::interceptor::{
    BasicAuthInterceptor, DiagnosticInterceptor, Interceptor, SigV4Interceptor,
    UriRewriteInterceptor,
};
use crate::{AuthMode, Client, TransportConfig, TransportGeneration};
use log::{info, warn};
use searchgate_aws_v4::{
    detect_service, DefaultCredentialProvider, DefaultRegionProvider, RequestSigner,
};
use searchgate_core::{Context, Error, OsEnv, Result, Signer};
use searchgate_file_read_tokio::TokioFileRead;
use searchgate_http_send_reqwest::ReqwestHttpSend;
use std::sync::Arc;

/// Builds clients for a transport generation.
///
/// ```no_run
/// use searchgate_transport::{TransportConfig, TransportFactory, TransportGeneration};
///
/// # async fn example() -> searchgate_core::Result<()> {
/// let config = TransportConfig::basic_auth_tls("localhost", 9200, Some("admin"), Some("admin"), true);
/// let client = TransportFactory::new(TransportGeneration::Current)
///     .build(&config)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransportFactory {
    generation: TransportGeneration,
    ctx: Context,
}

impl TransportFactory {
    /// Create a factory that resolves AWS settings from the process environment.
    pub fn new(generation: TransportGeneration) -> Self {
        Self {
            generation,
            ctx: Context::new()
                .with_file_read(TokioFileRead)
                .with_http_send(ReqwestHttpSend::default())
                .with_env(OsEnv),
        }
    }

    /// Resolve AWS credentials and region through `ctx` instead.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Build a client for `config`.
    ///
    /// Fails on invalid config, unresolvable service name, region or
    /// credentials, and TLS setup errors.
    pub async fn build(&self, config: &TransportConfig) -> Result<Client> {
        config.validate()?;
        let base_uri = config.base_uri()?;
        let https = base_uri.scheme() == Some(&http::uri::Scheme::HTTPS);

        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();

        let rewrite = match self.generation {
            TransportGeneration::Legacy => config.auth_mode == AuthMode::CloudSignature,
            TransportGeneration::Current => true,
        };
        if rewrite {
            interceptors.push(Arc::new(UriRewriteInterceptor));
        }

        if config.auth_mode == AuthMode::BasicAuthTls {
            match config.basic_credentials() {
                Some((username, password)) => interceptors.push(Arc::new(
                    BasicAuthInterceptor::new(&config.host, config.port, username, password)?,
                )),
                None => warn!("no complete basic credentials given, connecting without them"),
            }
        }

        let diagnostic = Arc::new(DiagnosticInterceptor::new(https));
        interceptors.push(diagnostic.clone());

        if config.auth_mode == AuthMode::CloudSignature {
            interceptors.push(Arc::new(self.sigv4(config).await?));
        }

        let trust_all = config.auth_mode == AuthMode::BasicAuthTls && config.trust_all_certificates;
        if trust_all {
            warn!("certificate validation is disabled for {base_uri}");
        }
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(trust_all)
            .build()
            .map_err(|e| Error::config_invalid("failed to build http client").with_source(e))?;

        info!(
            "built {:?} client for {base_uri} on the {:?} transport",
            config.auth_mode, self.generation
        );
        Ok(Client::new(
            self.generation,
            base_uri,
            http,
            interceptors,
            diagnostic,
        ))
    }

    async fn sigv4(&self, config: &TransportConfig) -> Result<SigV4Interceptor> {
        let endpoint = config.cloud_endpoint.as_deref().unwrap_or_default();

        let service = match config.service_name.as_deref() {
            Some(service) => service.to_string(),
            None => detect_service(endpoint)?.to_string(),
        };
        info!("using service name '{service}'");

        let mut region_provider = DefaultRegionProvider::new();
        if let Some(region) = &config.region {
            region_provider = region_provider.with_region(region);
        }
        let region = region_provider
            .provide_region(&self.ctx)
            .await?
            .ok_or_else(|| Error::config_invalid("no aws region could be resolved"))?;
        info!("using aws region: {region}");

        let signer = Signer::new(
            self.ctx.clone(),
            DefaultCredentialProvider::new(),
            RequestSigner::new(&service, &region),
        )
        .await?;

        Ok(SigV4Interceptor::new(signer))
    }
}
