//! Per-call request envelope handed to route handlers.

use crate::types::method::HttpMethod;
use serde_json::Value;
use std::collections::HashMap;

/// Everything a handler can learn about one intercepted call.
///
/// Built by the router when a registered matcher fires and discarded once
/// the response is produced. `path_args` holds the wildcard captures in
/// left-to-right order. `body` is only populated when the content-type
/// header indicates JSON and the raw body decodes cleanly; `raw_body`
/// always carries the untouched text.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub path_args: Vec<String>,
    pub method: HttpMethod,
    pub raw_url: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub raw_body: Option<String>,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
}

impl RequestEnvelope {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the request declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|v| v.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }

    /// Decode the raw body as JSON when the headers say it is JSON.
    /// Undecodable or non-JSON bodies stay raw-only.
    pub(crate) fn decode_body(&mut self) {
        if self.is_json() {
            self.body = self
                .raw_body
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok());
        }
    }
}
