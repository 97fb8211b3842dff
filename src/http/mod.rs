//! HTTP serving: the request dispatcher and the listener runtime.

pub mod dispatch;
pub mod server;

pub use dispatch::{AccessEntry, AccessSink, TracingSink};
pub use server::{serve, ServerError};
