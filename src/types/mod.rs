//! 类型模块：代理请求、响应信封与批量请求的核心数据类型。
//!
//! # Types Module
//!
//! Wire-level types shared by the proxy core and the HTTP surface.
//!
//! Upstream payloads are deliberately left as [`serde_json::Value`]: their
//! schema varies per endpoint, so only the envelope shape is validated.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ProxyRequest`] | Inbound request to forward (endpoint, method, body, params, cache flags) |
//! | [`HttpMethod`] | Normalized upstream method |
//! | [`ProxyEnvelope`] | Uniform `{status, statusText, data}` response wrapper |
//! | [`ErrorBody`] | `{error}` body returned on proxy-local failures |
//! | [`BatchRequest`] | `{ids}` payload of a batch-path request |

pub mod batch;
pub mod envelope;
pub mod request;

pub use batch::BatchRequest;
pub use envelope::{ErrorBody, ProxyEnvelope, STATUS_TEXT_CACHED, STATUS_TEXT_OK};
pub use request::{HttpMethod, ProxyRequest};
