//! Uniform serialization of handler results into wire responses.

use crate::backend::{InterceptedRequest, WireResponse};
use crate::config::options::{DebugMode, MockOptions};
use crate::types::method::HttpMethod;
use crate::types::reply::{HttpError, Reply};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Request/response details handed to debug callbacks.
#[derive(Debug)]
pub struct DebugInfo<'a> {
    pub method: HttpMethod,
    pub raw_url: &'a str,
    pub request_body: Option<&'a str>,
    pub request_headers: &'a HashMap<String, String>,
    pub status: u16,
    pub response: &'a Value,
}

/// Builds the outgoing wire response from a handler's final value.
///
/// `None` becomes a 404. Error replies keep their code and serialize as
/// `{code, message}` at the root, unless a response-info label is
/// configured, in which case the body is an empty object carrying the
/// info under that label. Successful object payloads get the info
/// attached under the label too; non-object payloads pass unchanged
/// (arrays cannot hold an extra key).
pub struct ResponseBuilder<'a> {
    options: &'a MockOptions,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(options: &'a MockOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, reply: Option<Reply>, request: &InterceptedRequest) -> WireResponse {
        let reply = reply.unwrap_or_else(|| Reply::Error(HttpError::not_found()));
        let label = self.options.http_response_info_label.as_deref();

        let (info, mut data) = match reply {
            Reply::Error(error) => {
                let body = if label.is_some() {
                    json!({})
                } else {
                    json!({"code": error.code, "message": error.message})
                };
                (error, body)
            }
            Reply::Payload(value) => (HttpError::new(200, "OK"), value),
        };

        if let Some(label) = label {
            if let Value::Object(map) = &mut data {
                map.insert(
                    label.to_string(),
                    json!({"code": info.code, "message": info.message}),
                );
            }
        }

        let body = data.to_string();
        self.emit_debug(request, info.code, &data);

        WireResponse {
            status: info.code,
            body,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
        }
    }

    // Side effect only; the response is already fixed.
    fn emit_debug(&self, request: &InterceptedRequest, status: u16, response: &Value) {
        match &self.options.debug {
            DebugMode::Off => {}
            DebugMode::Log => {
                tracing::debug!(
                    status,
                    response = %response,
                    ">>> {} {} <<< {}",
                    request.method,
                    request.raw_url,
                    status,
                );
            }
            DebugMode::Custom(callback) => {
                callback(&DebugInfo {
                    method: request.method,
                    raw_url: &request.raw_url,
                    request_body: request.body.as_deref(),
                    request_headers: &request.headers,
                    status,
                    response,
                });
            }
        }
    }
}
