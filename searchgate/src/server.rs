//! Line-delimited JSON bridge.
//!
//! Each line a client sends is one call:
//!
//! ```json
//! {"method": "execute", "params": {"query": "source=logs | head 5", "is_ppl": true, "format": "csv"}}
//! ```
//!
//! and each call is answered by one line, `{"result": ...}` or `{"error": "..."}`.

use crate::Gateway;
use log::{debug, error, info, warn};
use searchgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A call to one of the gateway entry points.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Call {
    InitializeConnection {
        host: String,
        port: u16,
        #[serde(default = "default_protocol")]
        protocol: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        ignore_ssl: bool,
    },
    InitializeAwsConnection {
        endpoint: String,
    },
    Execute {
        query: String,
        #[serde(default = "default_true")]
        is_ppl: bool,
        #[serde(default)]
        is_explain: bool,
        #[serde(default = "default_format")]
        format: String,
    },
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "json".to_string()
}

/// Answer to one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Result(Value),
    Error(String),
}

impl Call {
    /// Run the call against `gateway`. Blocks.
    pub fn dispatch(self, gateway: &Gateway) -> Reply {
        match self {
            Call::InitializeConnection {
                host,
                port,
                protocol,
                username,
                password,
                ignore_ssl,
            } => Reply::Result(Value::Bool(gateway.initialize_connection(
                &host,
                port,
                &protocol,
                username.as_deref(),
                password.as_deref(),
                ignore_ssl,
            ))),
            Call::InitializeAwsConnection { endpoint } => {
                Reply::Result(Value::Bool(gateway.initialize_aws_connection(&endpoint)))
            }
            Call::Execute {
                query,
                is_ppl,
                is_explain,
                format,
            } => Reply::Result(Value::String(
                gateway.execute(&query, is_ppl, is_explain, &format),
            )),
        }
    }
}

/// Serves the gateway over TCP.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    gateway: Arc<Gateway>,
}

impl Server {
    pub async fn bind(addr: &str, gateway: Arc<Gateway>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::config_invalid(format!("failed to listen on {addr}")).with_source(e))?;
        Ok(Self { listener, gateway })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    ///
    /// A failing connection only ends that connection.
    pub async fn serve(self) -> Result<()> {
        info!("gateway listening on {}", self.local_addr()?);
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("failed to accept connection: {err}");
                    continue;
                }
            };
            debug!("accepted connection from {peer}");

            let gateway = self.gateway.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, gateway).await {
                    warn!("connection from {peer} closed with error: {err:?}");
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, gateway: Arc<Gateway>) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Call>(&line) {
            Ok(call) => {
                debug!("dispatching {call:?}");
                let gateway = gateway.clone();
                match tokio::task::spawn_blocking(move || call.dispatch(&gateway)).await {
                    Ok(reply) => reply,
                    Err(err) => {
                        error!("gateway call panicked: {err}");
                        Reply::Error(format!("internal error: {err}"))
                    }
                }
            }
            Err(err) => Reply::Error(format!("invalid call: {err}")),
        };

        let mut out = serde_json::to_vec(&reply)
            .map_err(|e| Error::unexpected("failed to encode reply").with_source(e))?;
        out.push(b'\n');
        write.write_all(&out).await?;
    }

    Ok(())
}
