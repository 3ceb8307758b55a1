//! searchgate runs PPL and SQL queries against remote search clusters.
//!
//! The [`Gateway`] owns one cluster session at a time, built from a
//! [`transport::TransportConfig`] for plain HTTP, TLS with basic auth, or
//! SigV4 signed cloud endpoints. Queries go through a
//! [`query::QueryBridge`] and come back rendered as text.
//!
//! ```no_run
//! use searchgate::{Context, Gateway, GatewayConfig, OsEnv};
//!
//! # fn example(handle: tokio::runtime::Handle) {
//! let gateway = Gateway::new(GatewayConfig::default(), Context::new().with_env(OsEnv), handle);
//! assert!(gateway.initialize_connection("localhost", 9200, "http", None, None, false));
//! println!("{}", gateway.execute("source=logs | head 5", true, false, "table"));
//! # }
//! ```

pub use searchgate_core::*;

pub mod query {
    pub use searchgate_query::*;
}

pub mod transport {
    pub use searchgate_transport::*;
}

mod config;
pub use config::*;

mod gateway;
pub use gateway::{Gateway, NOT_CONNECTED};

pub mod server;
pub use server::Server;
