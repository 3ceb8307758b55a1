use anyhow::Result;
use pretty_assertions::assert_eq;
use searchgate::{Context, Gateway, GatewayConfig, Server, StaticEnv};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;

/// A cluster answering every query with the same two rows.
async fn mock_cluster() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                while !String::from_utf8_lossy(&buf).contains("\"}") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let body = r#"{"schema":[{"name":"host","type":"keyword"},{"name":"bytes","type":"long"}],"datarows":[["web-1",512],["web-2",null]],"total":2,"size":2,"status":200}"#;
                let resp = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(resp.as_bytes()).await;
            });
        }
    });

    Ok(addr)
}

struct Session {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl Session {
    async fn connect(addr: SocketAddr) -> Result<Self> {
        let (read, write) = TcpStream::connect(addr).await?.into_split();
        Ok(Self {
            lines: BufReader::new(read).lines(),
            write,
        })
    }

    async fn call(&mut self, line: &str) -> Result<Value> {
        self.write.write_all(line.as_bytes()).await?;
        self.write.write_all(b"\n").await?;
        let reply = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow::anyhow!("gateway closed the connection"))?;
        Ok(serde_json::from_str(&reply)?)
    }
}

async fn start_gateway() -> Result<SocketAddr> {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new().with_env(StaticEnv::default());
    let config = GatewayConfig {
        listen_addr: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    let gateway = Arc::new(Gateway::new(config.clone(), ctx, Handle::current()));
    let server = Server::bind(&config.listen_on(), gateway).await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.serve());
    Ok(addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_over_bridge() -> Result<()> {
    let cluster = mock_cluster().await?;
    let gateway = start_gateway().await?;
    let mut session = Session::connect(gateway).await?;

    let reply = session
        .call(r#"{"method":"execute","params":{"query":"source=logs"}}"#)
        .await?;
    assert_eq!(reply, json!({"result": searchgate::NOT_CONNECTED}));

    let reply = session
        .call(
            &json!({
                "method": "initialize_connection",
                "params": {"host": "127.0.0.1", "port": cluster.port(), "protocol": "http"}
            })
            .to_string(),
        )
        .await?;
    assert_eq!(reply, json!({"result": true}));

    let reply = session
        .call(r#"{"method":"execute","params":{"query":"source=logs | fields host, bytes","format":"csv"}}"#)
        .await?;
    assert_eq!(reply, json!({"result": "host,bytes\nweb-1,512\nweb-2,"}));

    let reply = session
        .call(r#"{"method":"execute","params":{"query":"SELECT host, bytes FROM logs","is_ppl":false,"format":"compact_json"}}"#)
        .await?;
    let rendered: Value = serde_json::from_str(reply["result"].as_str().unwrap_or_default())?;
    assert_eq!(rendered["datarows"], json!([["web-1", 512], ["web-2", null]]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bad_calls_keep_connection_open() -> Result<()> {
    let gateway = start_gateway().await?;
    let mut session = Session::connect(gateway).await?;

    let reply = session.call("not json").await?;
    assert!(reply["error"].as_str().unwrap_or_default().starts_with("invalid call"));

    let reply = session
        .call(r#"{"method":"initialize_aws_connection","params":{"endpoint":"cluster.internal"}}"#)
        .await?;
    assert_eq!(reply, json!({"result": false}));

    let reply = session
        .call(r#"{"method":"execute","params":{"query":"x"}}"#)
        .await?;
    assert_eq!(reply, json!({"result": searchgate::NOT_CONNECTED}));
    Ok(())
}
