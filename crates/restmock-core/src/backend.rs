//! Host-transport seam: where compiled routes get registered and calls
//! come back from.
//!
//! The real interception facility is a collaborator, not part of this
//! crate's core; [`HttpBackend`] is the capability it must offer.
//! [`LocalBackend`] is a synchronous in-memory implementation with a
//! pending-call queue and a manual flush, enough to drive client tests
//! (and this crate's own) without a network.

use crate::matching::UrlMatcher;
use crate::types::method::HttpMethod;
use std::collections::HashMap;

/// One intercepted call as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: HttpMethod,
    pub raw_url: String,
    pub body: Option<String>,
    pub headers: HashMap<String, String>,
}

/// Synthesized response: the `[status, bodyText, headers]` wire triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

/// Response-producing callback registered per (method, matcher) pair.
pub type RespondFn = Box<dyn Fn(&InterceptedRequest) -> WireResponse>;

/// Registration surface the router needs from the host transport.
pub trait HttpBackend {
    fn when(&mut self, method: HttpMethod, matcher: UrlMatcher, respond: RespondFn);
}

struct Registration {
    method: HttpMethod,
    matcher: UrlMatcher,
    respond: RespondFn,
}

/// In-memory transport: queues calls, resolves them on [`flush`].
///
/// Each pending call goes to the first registration whose method and URL
/// matcher both match; a call nothing claims resolves to `None`. A call's
/// full lifecycle completes before the next one starts.
///
/// [`flush`]: LocalBackend::flush
#[derive(Default)]
pub struct LocalBackend {
    registrations: Vec<Registration>,
    pending: Vec<InterceptedRequest>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an intercepted call for the next flush.
    pub fn call(
        &mut self,
        method: HttpMethod,
        raw_url: impl Into<String>,
        body: Option<&str>,
        headers: HashMap<String, String>,
    ) {
        self.pending.push(InterceptedRequest {
            method,
            raw_url: raw_url.into(),
            body: body.map(str::to_string),
            headers,
        });
    }

    /// Queue a call carrying a JSON body with the matching content-type.
    pub fn call_json(
        &mut self,
        method: HttpMethod,
        raw_url: impl Into<String>,
        body: &serde_json::Value,
    ) {
        let headers = HashMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]);
        self.call(method, raw_url, Some(&body.to_string()), headers);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Resolve every pending call in order. Unmatched calls yield `None`.
    pub fn flush(&mut self) -> Vec<Option<WireResponse>> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .map(|request| {
                self.registrations
                    .iter()
                    .find(|reg| {
                        reg.method == request.method
                            && reg.matcher.matches(&request.raw_url).is_some()
                    })
                    .map(|reg| (reg.respond)(&request))
            })
            .collect()
    }
}

impl HttpBackend for LocalBackend {
    fn when(&mut self, method: HttpMethod, matcher: UrlMatcher, respond: RespondFn) {
        self.registrations.push(Registration {
            method,
            matcher,
            respond,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::RouteTemplate;
    use rstest::rstest;

    fn matcher(template: &str) -> UrlMatcher {
        UrlMatcher::compile(&RouteTemplate::parse(template).unwrap())
    }

    fn canned(status: u16) -> RespondFn {
        Box::new(move |_| WireResponse {
            status,
            body: "{}".to_string(),
            headers: HashMap::new(),
        })
    }

    #[rstest]
    fn test_flush_dispatches_to_matching_registration() {
        let mut backend = LocalBackend::new();
        backend.when(HttpMethod::Get, matcher("/books"), canned(200));
        backend.when(HttpMethod::Get, matcher("/books/?"), canned(201));

        backend.call(HttpMethod::Get, "/books/7", None, HashMap::new());
        backend.call(HttpMethod::Get, "/books", None, HashMap::new());
        assert_eq!(backend.pending_count(), 2);

        let responses = backend.flush();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].as_ref().map(|r| r.status), Some(201));
        assert_eq!(responses[1].as_ref().map(|r| r.status), Some(200));
        assert_eq!(backend.pending_count(), 0);
    }

    #[rstest]
    fn test_method_participates_in_matching() {
        let mut backend = LocalBackend::new();
        backend.when(HttpMethod::Get, matcher("/books"), canned(200));

        backend.call(HttpMethod::Post, "/books", None, HashMap::new());
        let responses = backend.flush();
        assert_eq!(responses, vec![None]);
    }

    #[rstest]
    fn test_first_matching_registration_wins() {
        let mut backend = LocalBackend::new();
        backend.when(HttpMethod::Get, matcher("/books/?"), canned(200));
        backend.when(HttpMethod::Get, matcher("/books/?"), canned(500));

        backend.call(HttpMethod::Get, "/books/1", None, HashMap::new());
        let responses = backend.flush();
        assert_eq!(responses[0].as_ref().map(|r| r.status), Some(200));
    }

    #[rstest]
    fn test_call_json_sets_content_type() {
        let mut backend = LocalBackend::new();
        backend.when(
            HttpMethod::Post,
            matcher("/books"),
            Box::new(|request| {
                assert_eq!(
                    request.headers.get("Content-Type").map(String::as_str),
                    Some("application/json")
                );
                WireResponse {
                    status: 200,
                    body: request.body.clone().unwrap_or_default(),
                    headers: HashMap::new(),
                }
            }),
        );

        backend.call_json(HttpMethod::Post, "/books", &serde_json::json!({"a": 1}));
        let responses = backend.flush();
        assert_eq!(responses[0].as_ref().map(|r| r.body.as_str()), Some("{\"a\":1}"));
    }
}
