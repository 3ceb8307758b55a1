use crate::request::EXPLAIN_PATH;
use crate::service::{EngineRequest, QueryService, ResponseListener};
use crate::{Language, QueryResult};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Response};
use log::{debug, error, info};
use searchgate_core::{Body, Error, Result};
use searchgate_transport::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::runtime::Handle;

/// Engine service backed by the cluster's SQL/PPL REST plugin.
///
/// Calls are spawned on `handle` and answered through the listener.
#[derive(Debug, Clone)]
pub struct RemoteQueryService {
    client: Client,
    language: Language,
    handle: Handle,
}

impl RemoteQueryService {
    pub fn new(client: Client, language: Language, handle: Handle) -> Self {
        Self {
            client,
            language,
            handle,
        }
    }

    fn endpoint(&self, request: &EngineRequest) -> String {
        let base = self.language.plugin_path();
        if request.path == EXPLAIN_PATH {
            format!("{base}{EXPLAIN_PATH}")
        } else {
            base.to_string()
        }
    }

    fn spawn<T, F>(&self, request: EngineRequest, listener: Box<dyn ResponseListener<T>>, parse: F)
    where
        T: Send + 'static,
        F: FnOnce(&EngineRequest, Bytes) -> Result<T> + Send + 'static,
    {
        let client = self.client.clone();
        let endpoint = self.endpoint(&request);
        let language = self.language;

        self.handle.spawn(async move {
            info!("submitting {language} query to {endpoint}");
            let result = match post_query(&client, &endpoint, &request.query).await {
                Ok(bs) => parse(&request, bs),
                Err(err) => Err(err),
            };

            match result {
                Ok(v) => listener.on_response(v),
                Err(err) => {
                    error!("{language} query failed: {err}");
                    listener.on_failure(err)
                }
            }
        });
    }
}

impl QueryService for RemoteQueryService {
    fn execute(&self, request: EngineRequest, listener: Box<dyn ResponseListener<QueryResult>>) {
        self.spawn(request, listener, |request, bs| {
            let mut result: QueryResult = parse_json(&bs)?;
            if result.total == 0 {
                result.total = result.datarows.len() as u64;
            }
            result.truncate(request.settings.query_size_limit);
            debug!("query returned {} of {} rows", result.size, result.total);
            Ok(result)
        })
    }

    fn explain(&self, request: EngineRequest, listener: Box<dyn ResponseListener<Value>>) {
        self.spawn(request, listener, |_, bs| parse_json(&bs))
    }
}

async fn post_query(client: &Client, endpoint: &str, query: &str) -> Result<Bytes> {
    let payload = json!({ "query": query }).to_string();
    let req = http::Request::builder()
        .method(Method::POST)
        .uri(client.uri(endpoint)?)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload))?;

    let resp = client.send(req).await?;
    if resp.status().is_success() {
        Ok(resp.into_body())
    } else {
        Err(failure_from_response(resp))
    }
}

fn parse_json<T: DeserializeOwned>(bs: &[u8]) -> Result<T> {
    serde_json::from_slice(bs).map_err(|e| {
        Error::query_failed("failed to parse engine response").with_source(e)
    })
}

/// Turn a non-2xx response into an error carrying the cluster's reason.
fn failure_from_response(resp: Response<Bytes>) -> Error {
    let status = resp.status();
    let body = resp.into_body();

    let reason = serde_json::from_slice::<Value>(&body).ok().and_then(|v| {
        let err = v.get("error")?;
        if let Some(s) = err.as_str() {
            return Some(s.to_string());
        }
        let reason = err.get("reason").and_then(Value::as_str)?;
        match err.get("details").and_then(Value::as_str) {
            Some(details) if !details.is_empty() => Some(format!("{reason}: {details}")),
            _ => Some(reason.to_string()),
        }
    });

    match reason {
        Some(reason) => Error::query_failed(reason),
        None => Error::query_failed(format!(
            "query failed with status {status}: {}",
            String::from_utf8_lossy(&body)
        )),
    }
}
