use crate::service::{EngineRequest, EngineSettings, QueryService, ResponseListener};
use crate::{Language, QueryOutcome, QueryRequest, QueryResult};
use log::{debug, info, warn};
use searchgate_core::Error;
use serde_json::Value;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Default time to wait for an engine outcome.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Forwards both callbacks of one engine call into a single completion.
struct OutcomeListener {
    tx: oneshot::Sender<QueryOutcome>,
}

impl OutcomeListener {
    fn complete(self, outcome: QueryOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!("query outcome arrived after the caller stopped waiting");
        }
    }
}

impl ResponseListener<QueryResult> for OutcomeListener {
    fn on_response(self: Box<Self>, response: QueryResult) {
        self.complete(QueryOutcome::Success(response))
    }

    fn on_failure(self: Box<Self>, err: Error) {
        self.complete(QueryOutcome::Failure(err))
    }
}

impl ResponseListener<Value> for OutcomeListener {
    fn on_response(self: Box<Self>, response: Value) {
        self.complete(QueryOutcome::ExplainPlan(response))
    }

    fn on_failure(self: Box<Self>, err: Error) {
        self.complete(QueryOutcome::Failure(err))
    }
}

/// Turns the callback-based engine API into one blocking round trip.
///
/// ```no_run
/// use searchgate_query::{render, Format, QueryBridge, QueryRequest, Language};
/// # fn example(bridge: QueryBridge) {
/// let req = QueryRequest::new("source=logs | head 5", Language::Ppl);
/// let outcome = bridge.run(&req);
/// println!("{}", render(&outcome, Format::parse(&req.output_format)));
/// # }
/// ```
#[derive(Clone)]
pub struct QueryBridge {
    ppl: Arc<dyn QueryService>,
    sql: Arc<dyn QueryService>,
    settings: Arc<EngineSettings>,
    handle: Handle,
    timeout: Option<Duration>,
}

impl Debug for QueryBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBridge")
            .field("ppl", &self.ppl)
            .field("sql", &self.sql)
            .field("settings", &self.settings)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QueryBridge {
    pub fn new(
        ppl: Arc<dyn QueryService>,
        sql: Arc<dyn QueryService>,
        settings: EngineSettings,
        handle: Handle,
    ) -> Self {
        Self {
            ppl,
            sql,
            settings: Arc::new(settings),
            handle,
            timeout: Some(DEFAULT_QUERY_TIMEOUT),
        }
    }

    /// Set how long to wait for an outcome. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Submit the query and block the calling thread until its outcome.
    ///
    /// Must not be called from inside an async context; use
    /// [`QueryBridge::run_async`] there.
    pub fn run(&self, request: &QueryRequest) -> QueryOutcome {
        self.handle.block_on(self.run_async(request))
    }

    /// Submit the query and wait for its outcome.
    pub async fn run_async(&self, request: &QueryRequest) -> QueryOutcome {
        let route = request.route();
        info!(
            "running {} query, explain: {}, path: {}",
            request.language, route.explain, route.path
        );

        let service = match request.language {
            Language::Ppl => &self.ppl,
            Language::Sql => &self.sql,
        };
        let engine_request = EngineRequest {
            query: route.text.to_string(),
            path: route.path.to_string(),
            settings: self.settings.clone(),
        };

        let (tx, rx) = oneshot::channel();
        let listener = OutcomeListener { tx };
        if route.explain {
            service.explain(engine_request, Box::new(listener));
        } else {
            service.execute(engine_request, Box::new(listener));
        }

        let received = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!("no query outcome within {timeout:?}");
                    return QueryOutcome::Failure(Error::timeout("timeout"));
                }
            },
            None => rx.await,
        };

        received.unwrap_or_else(|_| {
            QueryOutcome::Failure(Error::unexpected(
                "query engine finished without reporting an outcome",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use searchgate_core::ErrorKind;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Drop,
        Hang,
    }

    #[derive(Debug)]
    struct MockService {
        behavior: Behavior,
        seen: Mutex<Vec<(String, String, &'static str)>>,
        parked: Mutex<Vec<Box<dyn std::any::Any + Send>>>,
    }

    impl MockService {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                seen: Mutex::new(Vec::new()),
                parked: Mutex::new(Vec::new()),
            })
        }

        fn answer<T: Send + 'static>(&self, listener: Box<dyn ResponseListener<T>>, v: T) {
            match self.behavior {
                Behavior::Succeed => listener.on_response(v),
                Behavior::Fail => listener.on_failure(Error::query_failed("no such index")),
                Behavior::Drop => drop(listener),
                Behavior::Hang => self.parked.lock().unwrap().push(Box::new(listener)),
            }
        }
    }

    impl QueryService for MockService {
        fn execute(&self, request: EngineRequest, listener: Box<dyn ResponseListener<QueryResult>>) {
            self.seen
                .lock()
                .unwrap()
                .push((request.query, request.path, "execute"));
            self.answer(listener, QueryResult::default())
        }

        fn explain(&self, request: EngineRequest, listener: Box<dyn ResponseListener<Value>>) {
            self.seen
                .lock()
                .unwrap()
                .push((request.query, request.path, "explain"));
            self.answer(listener, serde_json::json!({"root": {"name": "ProjectOperator"}}))
        }
    }

    fn bridge(ppl: Arc<MockService>, sql: Arc<MockService>) -> QueryBridge {
        QueryBridge::new(ppl, sql, EngineSettings::default(), Handle::current())
    }

    #[tokio::test]
    async fn test_explain_keyword_routes_to_explain() {
        let ppl = MockService::new(Behavior::Succeed);
        let sql = MockService::new(Behavior::Succeed);
        let bridge = bridge(ppl.clone(), sql.clone());

        let outcome = bridge
            .run_async(&QueryRequest::new("EXPLAIN source=logs", Language::Ppl))
            .await;
        assert!(matches!(outcome, QueryOutcome::ExplainPlan(_)));

        let seen = ppl.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![("source=logs".to_string(), "/_explain".to_string(), "explain")]
        );
        assert!(sql.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sql_execute() {
        let ppl = MockService::new(Behavior::Succeed);
        let sql = MockService::new(Behavior::Succeed);
        let bridge = bridge(ppl.clone(), sql.clone());

        let outcome = bridge
            .run_async(&QueryRequest::new("SELECT 1", Language::Sql))
            .await;
        assert!(matches!(outcome, QueryOutcome::Success(_)));
        assert_eq!(sql.seen.lock().unwrap()[0].1, "/_plugins/_sql");
    }

    #[tokio::test]
    async fn test_engine_failure_is_verbatim() {
        let svc = MockService::new(Behavior::Fail);
        let bridge = bridge(svc.clone(), svc);

        match bridge.run_async(&QueryRequest::new("x", Language::Ppl)).await {
            QueryOutcome::Failure(err) => {
                assert_eq!(err.kind(), ErrorKind::QueryFailed);
                assert_eq!(err.to_string(), "no such index");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_listener_is_failure() {
        let svc = MockService::new(Behavior::Drop);
        let bridge = bridge(svc.clone(), svc);

        let outcome = bridge.run_async(&QueryRequest::new("x", Language::Ppl)).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_yields_timeout() {
        let svc = MockService::new(Behavior::Hang);
        let bridge = bridge(svc.clone(), svc).with_timeout(Some(Duration::from_secs(1)));

        match bridge.run_async(&QueryRequest::new("x", Language::Ppl)).await {
            QueryOutcome::Failure(err) => {
                assert_eq!(err.kind(), ErrorKind::Timeout);
                assert_eq!(err.to_string(), "timeout");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_blocking_run() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let svc = MockService::new(Behavior::Succeed);
        let bridge = QueryBridge::new(svc.clone(), svc, EngineSettings::default(), rt.handle().clone());

        let outcome = bridge.run(&QueryRequest::new("source=logs", Language::Ppl));
        assert!(matches!(outcome, QueryOutcome::Success(_)));
    }
}
