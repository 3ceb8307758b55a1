//! Query execution for searchgate.
//!
//! [`QueryBridge`] submits a [`QueryRequest`] to one of two engine services
//! (PPL or SQL) and blocks until the outcome arrives. [`render`] turns the
//! outcome into text in the requested [`Format`].
//!
//! The engine itself sits behind the callback-based [`QueryService`] trait.
//! [`RemoteQueryService`] implements it against a cluster's SQL/PPL plugin.

mod request;
pub use request::{Language, QueryRequest, Route, EXPLAIN_PATH, PPL_PATH, SQL_PATH};

mod model;
pub use model::{Column, QueryOutcome, QueryResult};

mod service;
pub use service::{EngineRequest, EngineSettings, QueryService, ResponseListener};

mod remote;
pub use remote::RemoteQueryService;

mod bridge;
pub use bridge::{QueryBridge, DEFAULT_QUERY_TIMEOUT};

mod render;
pub use render::{render, Format};
