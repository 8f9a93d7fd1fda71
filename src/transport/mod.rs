//! Upstream transport: executes one proxied call and normalizes the result.

pub mod http;

pub use http::{HttpTransport, TransportError};
