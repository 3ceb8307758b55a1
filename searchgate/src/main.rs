use log::{error, info};
use searchgate::{Context, Gateway, GatewayConfig, OsEnv, Server};
use searchgate_file_read_tokio::TokioFileRead;
use searchgate_http_send_reqwest::ReqwestHttpSend;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::runtime::Handle;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let config = match GatewayConfig::load(&ctx).await {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load config: {err:?}");
            return ExitCode::FAILURE;
        }
    };
    info!("starting gateway with {config:?}");

    let addr = config.listen_on();
    let gateway = Arc::new(Gateway::new(config, ctx, Handle::current()));
    let server = match Server::bind(&addr, gateway).await {
        Ok(server) => server,
        Err(err) => {
            error!("failed to start gateway server: {err:?}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        res = server.serve() => {
            if let Err(err) = res {
                error!("gateway server stopped: {err:?}");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    ExitCode::SUCCESS
}
