use pretty_assertions::assert_eq;
use searchgate_query::{
    render, EngineSettings, Format, Language, QueryBridge, QueryOutcome, QueryRequest,
    RemoteQueryService,
};
use searchgate_transport::{TransportConfig, TransportFactory, TransportGeneration};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

/// Serves `(status, body)` for every request and records request heads and bodies.
async fn serve(status: u16, body: &'static str) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let captured = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let captured = captured.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                // Read until the head is complete and the declared body arrived.
                loop {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf).to_string();
                    if let Some(idx) = text.find("\r\n\r\n") {
                        let length = text[..idx]
                            .lines()
                            .find_map(|l| {
                                let (k, v) = l.split_once(':')?;
                                k.eq_ignore_ascii_case("content-length")
                                    .then(|| v.trim().parse::<usize>().ok())?
                            })
                            .unwrap_or(0);
                        if buf.len() >= idx + 4 + length {
                            break;
                        }
                    }
                }
                captured
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf).to_string());

                let resp = format!(
                    "HTTP/1.1 {status} Mock\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(resp.as_bytes()).await;
            });
        }
    });

    (addr, seen)
}

fn bridge(rt: &Runtime, addr: SocketAddr, settings: EngineSettings) -> QueryBridge {
    let client = rt
        .block_on(
            TransportFactory::new(TransportGeneration::Current)
                .build(&TransportConfig::anonymous("127.0.0.1", addr.port())),
        )
        .unwrap();

    let ppl = RemoteQueryService::new(client.clone(), Language::Ppl, rt.handle().clone());
    let sql = RemoteQueryService::new(client, Language::Sql, rt.handle().clone());
    QueryBridge::new(Arc::new(ppl), Arc::new(sql), settings, rt.handle().clone())
}

#[test]
fn test_ppl_execute_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let rt = Runtime::new().unwrap();
    let (addr, seen) = rt.block_on(serve(
        200,
        r#"{"schema":[{"name":"host","type":"keyword"}],"datarows":[["a"],["b"],["c"]],"total":3,"size":3,"status":200}"#,
    ));

    let settings = EngineSettings {
        query_size_limit: 2,
        ..Default::default()
    };
    let bridge = bridge(&rt, addr, settings);

    let req = QueryRequest::new("source=logs | fields host", Language::Ppl)
        .with_output_format("csv");
    let outcome = bridge.run(&req);
    assert_eq!(render(&outcome, Format::parse(&req.output_format)), "host\na\nb");

    let seen = seen.lock().unwrap();
    assert!(seen[0].starts_with("POST /_plugins/_ppl HTTP/1.1"));
    assert!(seen[0].ends_with(r#"{"query":"source=logs | fields host"}"#));
}

#[test]
fn test_sql_explain_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let rt = Runtime::new().unwrap();
    let (addr, seen) = rt.block_on(serve(200, r#"{"root":{"name":"ProjectOperator"}}"#));
    let bridge = bridge(&rt, addr, EngineSettings::default());

    let outcome = bridge.run(&QueryRequest::new("explain SELECT 1", Language::Sql));
    match &outcome {
        QueryOutcome::ExplainPlan(plan) => assert_eq!(plan["root"]["name"], "ProjectOperator"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(seen.lock().unwrap()[0].starts_with("POST /_plugins/_sql/_explain HTTP/1.1"));
}

#[test]
fn test_cluster_error_becomes_failure() {
    let _ = env_logger::builder().is_test(true).try_init();
    let rt = Runtime::new().unwrap();
    let (addr, _) = rt.block_on(serve(
        400,
        r#"{"error":{"reason":"Invalid SQL query","details":"no such index [nope]","type":"IndexNotFoundException"},"status":400}"#,
    ));
    let bridge = bridge(&rt, addr, EngineSettings::default());

    let outcome = bridge.run(&QueryRequest::new("SELECT * FROM nope", Language::Sql));
    assert!(outcome.is_failure());
    assert_eq!(
        render(&outcome, Format::Table),
        "Invalid SQL query: no such index [nope]"
    );
}

#[test]
fn test_unreachable_cluster_renders_transport_cause() {
    let _ = env_logger::builder().is_test(true).try_init();
    let rt = Runtime::new().unwrap();
    let addr = rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    });
    let bridge = bridge(&rt, addr, EngineSettings::default());

    let outcome = bridge.run(&QueryRequest::new("SELECT 1", Language::Sql));
    assert!(outcome.is_failure());
    let text = render(&outcome, Format::Json);
    assert!(text.starts_with("failed to send http request: "), "{text}");
    assert!(text.len() > "failed to send http request: ".len());
}
