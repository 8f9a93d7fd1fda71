//! Proxy entry point: gate, cache, forwarder and batch coordinator wired together.
//!
//! Keep the public surface small: build a [`ProxyService`] once with
//! [`ProxyServiceBuilder`] and share it behind an `Arc`.

pub mod builder;
pub mod core;

pub use builder::ProxyServiceBuilder;
pub use core::ProxyService;
