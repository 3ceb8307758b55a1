//! Authenticated HTTP transports for search clusters.
//!
//! [`TransportFactory`] turns a [`TransportConfig`] into a [`Client`] for one
//! of three authentication modes:
//!
//! - `Anonymous`: plain HTTP.
//! - `BasicAuthTls`: HTTPS, credentials scoped to the cluster host, optional
//!   trust-all certificates.
//! - `CloudSignature`: HTTPS with AWS SigV4 signing.
//!
//! Every request runs through the same interceptor pipeline before it is
//! sent. The [`TransportGeneration`] decides whether interceptors see the
//! body directly or through a per-request side channel.

mod config;
pub use config::{AuthMode, TransportConfig};

mod generation;
pub use generation::TransportGeneration;

mod exchange;
pub use exchange::{Entity, Exchange};

pub mod interceptor;

mod client;
pub use client::Client;

mod factory;
pub use factory::TransportFactory;
