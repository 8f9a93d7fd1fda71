//! Payload of a batch-path request.

use super::request::scalar_to_string;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

/// Ordered ids to resolve against one item endpoint.
///
/// Duplicates are kept; they resolve independently and land in the same
/// result slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    pub ids: Vec<String>,
}

impl BatchRequest {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Extract `{ids: [...]}` from the inbound `data` field.
    pub fn from_body(body: Option<&Value>) -> Result<Self> {
        let ctx = || {
            ErrorContext::new()
                .with_field_path("data.ids")
                .with_source("batch_coordinator")
        };

        let ids = body
            .and_then(|b| b.get("ids"))
            .ok_or_else(|| Error::validation_with_context("batch request requires ids", ctx()))?;

        let items = ids.as_array().ok_or_else(|| {
            Error::validation_with_context(
                "ids must be an array",
                ctx().with_details(format!("got {}", ids)),
            )
        })?;

        let ids = items
            .iter()
            .map(|v| {
                scalar_to_string(v).ok_or_else(|| {
                    Error::validation_with_context(
                        "ids must be strings or numbers",
                        ctx().with_details(format!("got {}", v)),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(bad) = ids.iter().find(|id| !is_path_segment(id)) {
            return Err(Error::validation_with_context(
                "ids must be single path segments",
                ctx().with_details(format!(
                    "'{}' is empty, a dot segment, or contains '/', '?', '#' or '%'",
                    bad
                )),
            ));
        }

        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Each id becomes the last segment of `{item_endpoint}/{id}`; anything that
/// would change the path, start a query or fragment, or decode differently
/// upstream is refused.
fn is_path_segment(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '?', '#', '%'])
        && !id.chars().any(char::is_control)
}
