//! Handler result values: payloads and tagged HTTP errors.

use serde::Serialize;
use serde_json::Value;

/// Tagged error outcome carried through the response pipeline.
///
/// Distinguished from ordinary payloads so that post-processors and
/// enveloping skip it. Serialized as `{code, message}` when it reaches
/// the response root.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HttpError {
    pub code: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The standard miss outcome for absent items and handlers that
    /// produced nothing.
    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    pub fn bad_request() -> Self {
        Self::new(400, "Bad Request")
    }
}

/// Value produced by a route handler or post-processor.
///
/// Handlers return `Option<Reply>`; `None` stands for "nothing here" and
/// becomes a 404 when the response is built. The post-processor chain
/// stops as soon as the current value turns into an [`HttpError`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Payload(Value),
    Error(HttpError),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Payload(value)
    }
}

impl From<HttpError> for Reply {
    fn from(error: HttpError) -> Self {
        Reply::Error(error)
    }
}
