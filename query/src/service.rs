use crate::QueryResult;
use searchgate_core::Error;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Engine settings owned by the gateway.
///
/// Passed to the engine with every request, never modified on the way.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum number of rows returned for one query.
    pub query_size_limit: usize,
    /// Engine feature flags, opaque to the gateway.
    pub flags: BTreeMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            query_size_limit: 200,
            flags: BTreeMap::new(),
        }
    }
}

/// A request handed to a [`QueryService`].
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub query: String,
    pub path: String,
    pub settings: Arc<EngineSettings>,
}

/// Receives the outcome of one engine call.
///
/// Both methods consume the listener, so at most one of them runs.
pub trait ResponseListener<T>: Send + 'static {
    fn on_response(self: Box<Self>, response: T);

    fn on_failure(self: Box<Self>, err: Error);
}

/// The engine contract: submit a request and get called back later.
///
/// Implementations must eventually call exactly one listener method, or drop
/// the listener.
pub trait QueryService: Debug + Send + Sync + 'static {
    fn execute(&self, request: EngineRequest, listener: Box<dyn ResponseListener<QueryResult>>);

    fn explain(&self, request: EngineRequest, listener: Box<dyn ResponseListener<Value>>);
}
