use crate::GatewayConfig;
use log::{error, info};
use searchgate_core::{Context, Error, Result};
use searchgate_query::{
    render, Format, Language, QueryBridge, QueryOutcome, QueryRequest, RemoteQueryService,
};
use searchgate_transport::{Client, TransportConfig, TransportFactory};
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;

/// Returned by [`Gateway::execute`] before any connection was initialized.
pub const NOT_CONNECTED: &str = "Not connected: call initialize_connection or initialize_aws_connection first";

/// Entry points exposed to callers.
///
/// All methods block the calling thread and must not be called from inside
/// an async context. Connections are replaced, not stacked: a successful
/// initialize call drops the previous session.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    ctx: Context,
    handle: Handle,
    bridge: RwLock<Option<QueryBridge>>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, ctx: Context, handle: Handle) -> Self {
        Self {
            config,
            ctx,
            handle,
            bridge: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Connect to a self-managed cluster.
    ///
    /// `https` selects TLS with optional basic auth, anything else plain HTTP.
    pub fn initialize_connection(
        &self,
        host: &str,
        port: u16,
        protocol: &str,
        username: Option<&str>,
        password: Option<&str>,
        ignore_ssl: bool,
    ) -> bool {
        let config = if protocol.eq_ignore_ascii_case("https") {
            TransportConfig::basic_auth_tls(host, port, username, password, ignore_ssl)
        } else {
            TransportConfig::anonymous(host, port)
        };

        match self.connect(&config) {
            Ok(()) => {
                info!("initialized connection to {protocol}://{host}:{port}");
                true
            }
            Err(err) => {
                error!("failed to initialize connection: {err:?}");
                false
            }
        }
    }

    /// Connect to a managed cloud endpoint with SigV4 signing.
    ///
    /// Region and credentials come from the AWS environment.
    pub fn initialize_aws_connection(&self, endpoint: &str) -> bool {
        match self.connect(&TransportConfig::cloud_signature(endpoint)) {
            Ok(()) => {
                info!("initialized aws connection to {endpoint}");
                true
            }
            Err(err) => {
                error!("failed to initialize aws connection: {err:?}");
                false
            }
        }
    }

    /// Run one query and render its outcome.
    pub fn execute(&self, query: &str, is_ppl: bool, is_explain: bool, format: &str) -> String {
        let Some(bridge) = self.current_bridge() else {
            return NOT_CONNECTED.to_string();
        };

        let request = QueryRequest::new(query, Language::from_ppl_flag(is_ppl))
            .with_explain(is_explain)
            .with_output_format(format);
        let outcome = bridge.run(&request);
        if let QueryOutcome::Failure(err) = &outcome {
            error!("query failed: {err:?}");
        }
        render(&outcome, Format::parse(&request.output_format))
    }

    fn current_bridge(&self) -> Option<QueryBridge> {
        match self.bridge.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn connect(&self, config: &TransportConfig) -> Result<()> {
        let factory =
            TransportFactory::new(self.config.generation()).with_context(self.ctx.clone());
        let client = self.handle.block_on(factory.build(config))?;
        let bridge = self.bridge_for(client);

        let mut guard = self
            .bridge
            .write()
            .map_err(|_| Error::unexpected("gateway session lock poisoned"))?;
        *guard = Some(bridge);
        Ok(())
    }

    fn bridge_for(&self, client: Client) -> QueryBridge {
        let ppl = RemoteQueryService::new(client.clone(), Language::Ppl, self.handle.clone());
        let sql = RemoteQueryService::new(client, Language::Sql, self.handle.clone());

        QueryBridge::new(
            Arc::new(ppl),
            Arc::new(sql),
            self.config.engine.clone(),
            self.handle.clone(),
        )
        .with_timeout(self.config.query_timeout())
    }
}
