//! staticd: a controllable, embeddable static-content server.
//!
//! Exposes a directory tree over HTTP or HTTPS as one pluggable unit inside
//! a larger interactive tool. The unit is driven through the
//! [`ServerControl`] contract: configure resolves named parameters from a
//! shared [`params::ParamStore`] and provisions TLS material, generating a
//! self-signed pair on first use; start serves in the background; stop
//! drains connections against a bounded deadline. Fatal listener faults are
//! delivered on a channel so the supervisor chooses between process exit
//! and log-and-continue.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod params;
pub mod tls;

pub use error::ModuleError;
pub use lifecycle::{HttpServer, ServerControl};
