//! Path router: declarative route templates over the transport seam.

use crate::backend::{HttpBackend, InterceptedRequest, RespondFn, WireResponse};
use crate::config::error::ConfigError;
use crate::config::options::MockOptions;
use crate::matching::{parse_query_string, split_url, RouteTemplate, UrlMatcher};
use crate::response::ResponseBuilder;
use crate::types::method::HttpMethod;
use crate::types::reply::{HttpError, Reply};
use crate::types::request::RequestEnvelope;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Route handler: produces a reply for one request envelope, `None` for
/// not-found.
pub type HandlerFn = Rc<dyn Fn(&RequestEnvelope) -> Option<Reply>>;

/// Post-processor: transforms the current payload into the next reply.
/// The chain stops once a processor returns an error.
pub type PostProcFn = Rc<dyn Fn(Value, &RequestEnvelope) -> Reply>;

/// Router for one base URL template.
///
/// Each [`route`] registration compiles `base + sub_pattern` into a
/// matcher and hands the transport a respond callback that runs the full
/// pipeline: extract path arguments, parse the query string, decode the
/// body, invoke the handler, apply post-processors in registration
/// order, and serialize through [`ResponseBuilder`].
///
/// [`route`]: Router::route
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

pub(crate) struct RouterInner {
    base: RouteTemplate,
    options: RefCell<MockOptions>,
    backend: Rc<RefCell<dyn HttpBackend>>,
}

/// Handle to one registered route, for attaching post-processing.
#[derive(Clone)]
pub struct RouteHandle {
    post_procs: Rc<RefCell<Vec<PostProcFn>>>,
    finalizer: Rc<RefCell<Option<PostProcFn>>>,
}

impl RouteHandle {
    /// Append a post-processor to this route's chain.
    pub fn add_post_proc(&self, proc: PostProcFn) -> &Self {
        self.post_procs.borrow_mut().push(proc);
        self
    }

    /// Install a shaping step that runs after the whole chain (used for
    /// response enveloping, which must see filtered data).
    pub fn set_finalizer(&self, proc: PostProcFn) -> &Self {
        *self.finalizer.borrow_mut() = Some(proc);
        self
    }
}

impl Router {
    pub fn new(
        base: &str,
        options: MockOptions,
        backend: Rc<RefCell<dyn HttpBackend>>,
    ) -> Result<Self, ConfigError> {
        let base = RouteTemplate::parse(base)?;
        options.validate()?;
        Ok(Self {
            inner: Rc::new(RouterInner {
                base,
                options: RefCell::new(options),
                backend,
            }),
        })
    }

    pub fn base(&self) -> &str {
        self.inner.base.as_str()
    }

    /// Replace the options wholesale. Chainable.
    pub fn set_options(&self, options: MockOptions) -> Result<&Self, ConfigError> {
        options.validate()?;
        *self.inner.options.borrow_mut() = options;
        Ok(self)
    }

    /// Merge an untyped options patch over the current options; unknown
    /// keys fail. Chainable.
    pub fn set_options_value(&self, patch: Value) -> Result<&Self, ConfigError> {
        let merged = self.inner.options.borrow().merge_value(patch)?;
        *self.inner.options.borrow_mut() = merged;
        Ok(self)
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> MockOptions {
        self.inner.options.borrow().clone()
    }

    // Programmatic label updates; the typed fields need no re-validation
    pub(crate) fn replace_options(&self, options: MockOptions) {
        *self.inner.options.borrow_mut() = options;
    }

    pub(crate) fn backend_handle(&self) -> Rc<RefCell<dyn HttpBackend>> {
        self.inner.backend.clone()
    }

    /// Register a handler for `method` on `base + sub_pattern`. The empty
    /// sub-pattern denotes the base path itself.
    pub fn route(
        &self,
        method: HttpMethod,
        sub_pattern: &str,
        handler: HandlerFn,
    ) -> Result<RouteHandle, ConfigError> {
        let sub = RouteTemplate::parse(sub_pattern)?;
        let full = self.inner.base.join(&sub);
        let matcher = UrlMatcher::compile(&full);

        let handle = RouteHandle {
            post_procs: Rc::new(RefCell::new(Vec::new())),
            finalizer: Rc::new(RefCell::new(None)),
        };

        // The respond closure outlives this router inside the backend;
        // a weak reference keeps the ownership graph acyclic.
        let inner = Rc::downgrade(&self.inner);
        let extractor = matcher.clone();
        let post_procs = handle.post_procs.clone();
        let finalizer = handle.finalizer.clone();
        let respond: RespondFn = Box::new(move |request| {
            dispatch(&inner, &extractor, &handler, &post_procs, &finalizer, request)
        });

        self.inner.backend.borrow_mut().when(method, matcher, respond);
        Ok(handle)
    }
}

fn dispatch(
    inner: &Weak<RouterInner>,
    matcher: &UrlMatcher,
    handler: &HandlerFn,
    post_procs: &RefCell<Vec<PostProcFn>>,
    finalizer: &RefCell<Option<PostProcFn>>,
    request: &InterceptedRequest,
) -> WireResponse {
    let Some(inner) = inner.upgrade() else {
        return dead_router_response();
    };

    let (path, query) = split_url(&request.raw_url);
    let path_args = matcher.matches(path).unwrap_or_default();
    let mut envelope = RequestEnvelope {
        path_args,
        method: request.method,
        raw_url: request.raw_url.clone(),
        path: path.to_string(),
        query: parse_query_string(query),
        raw_body: request.body.clone(),
        body: None,
        headers: request.headers.clone(),
    };
    envelope.decode_body();

    let mut reply = handler(&envelope);

    for proc in post_procs.borrow().iter() {
        match reply.take() {
            // Only payloads flow on; errors and misses end the chain
            Some(Reply::Payload(value)) => reply = Some(proc(value, &envelope)),
            other => {
                reply = other;
                break;
            }
        }
    }
    let reply = match (reply, finalizer.borrow().as_ref()) {
        (Some(Reply::Payload(value)), Some(shape)) => Some(shape(value, &envelope)),
        (other, _) => other,
    };

    let options = inner.options.borrow();
    ResponseBuilder::new(&options).build(reply, request)
}

fn dead_router_response() -> WireResponse {
    let error = HttpError::new(500, "Internal Server Error");
    WireResponse {
        status: error.code,
        body: serde_json::json!({"code": error.code, "message": error.message}).to_string(),
        headers: HashMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use rstest::rstest;
    use serde_json::json;

    fn backend() -> Rc<RefCell<LocalBackend>> {
        Rc::new(RefCell::new(LocalBackend::new()))
    }

    fn router(backend: &Rc<RefCell<LocalBackend>>, base: &str) -> Router {
        Router::new(base, MockOptions::default(), backend.clone()).unwrap()
    }

    fn get(backend: &Rc<RefCell<LocalBackend>>, url: &str) -> WireResponse {
        let mut b = backend.borrow_mut();
        b.call(HttpMethod::Get, url, None, HashMap::new());
        b.flush().pop().unwrap().expect("route should match")
    }

    fn body_of(response: &WireResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[rstest]
    #[case("foo")]
    #[case("/foo/")]
    #[case("/fo&o")]
    fn test_invalid_base_template_fails(#[case] base: &str) {
        let result = Router::new(base, MockOptions::default(), backend());
        assert!(matches!(result, Err(ConfigError::InvalidTemplate(_))));
    }

    #[rstest]
    fn test_invalid_sub_pattern_fails() {
        let backend = backend();
        let r = router(&backend, "/foo");
        let result = r.route(HttpMethod::Get, "/bar/", Rc::new(|_| None));
        assert!(matches!(result, Err(ConfigError::InvalidTemplate(_))));
    }

    #[rstest]
    fn test_simple_route_responds() {
        let backend = backend();
        let r = router(&backend, "/foo");
        r.route(
            HttpMethod::Get,
            "",
            Rc::new(|_| Some(Reply::Payload(json!({"foo": "narf"})))),
        )
        .unwrap();

        let response = get(&backend, "/foo");
        assert_eq!(response.status, 200);
        assert_eq!(body_of(&response), json!({"foo": "narf"}));
    }

    #[rstest]
    fn test_path_args_arrive_in_order() {
        let backend = backend();
        let r = router(&backend, "/foo");
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = calls.clone();
        r.route(
            HttpMethod::Get,
            "/bar/?/baz/?",
            Rc::new(move |request| {
                seen.borrow_mut().push(request.path_args.clone());
                Some(Reply::Payload(json!(null)))
            }),
        )
        .unwrap();

        get(&backend, "/foo/bar/12/baz/x-y");
        assert_eq!(&*calls.borrow(), &[vec!["12".to_string(), "x-y".to_string()]]);
    }

    #[rstest]
    fn test_query_string_does_not_affect_matching() {
        let backend = backend();
        let r = router(&backend, "/foo");
        r.route(
            HttpMethod::Get,
            "/bar/?",
            Rc::new(|request| Some(Reply::Payload(json!({
                "arg": request.path_args[0],
                "q": request.query.get("q"),
            })))),
        )
        .unwrap();

        let response = get(&backend, "/foo/bar/9?q=z");
        assert_eq!(body_of(&response), json!({"arg": "9", "q": "z"}));
    }

    #[rstest]
    fn test_handler_none_becomes_404() {
        let backend = backend();
        let r = router(&backend, "/foo");
        r.route(HttpMethod::Get, "", Rc::new(|_| None)).unwrap();

        let response = get(&backend, "/foo");
        assert_eq!(response.status, 404);
        assert_eq!(body_of(&response), json!({"code": 404, "message": "Not Found"}));
    }

    #[rstest]
    fn test_post_procs_run_in_registration_order() {
        let backend = backend();
        let r = router(&backend, "/foo");
        let handle = r
            .route(
                HttpMethod::Get,
                "",
                Rc::new(|_| Some(Reply::Payload(json!("a")))),
            )
            .unwrap();
        handle
            .add_post_proc(Rc::new(|value, _| {
                Reply::Payload(json!(format!("{}b", value.as_str().unwrap())))
            }))
            .add_post_proc(Rc::new(|value, _| {
                Reply::Payload(json!(format!("{}c", value.as_str().unwrap())))
            }));

        let response = get(&backend, "/foo");
        assert_eq!(body_of(&response), json!("abc"));
    }

    #[rstest]
    fn test_post_proc_chain_short_circuits_on_error() {
        let backend = backend();
        let r = router(&backend, "/foo");
        let reached = Rc::new(RefCell::new(false));
        let flag = reached.clone();
        let handle = r
            .route(
                HttpMethod::Get,
                "",
                Rc::new(|_| Some(Reply::Payload(json!([])))),
            )
            .unwrap();
        handle
            .add_post_proc(Rc::new(|_, _| Reply::Error(HttpError::new(400, "stop"))))
            .add_post_proc(Rc::new(move |value, _| {
                *flag.borrow_mut() = true;
                Reply::Payload(value)
            }));

        let response = get(&backend, "/foo");
        assert_eq!(response.status, 400);
        assert!(!*reached.borrow());
    }

    #[rstest]
    fn test_error_reply_skips_post_procs() {
        let backend = backend();
        let r = router(&backend, "/foo");
        let reached = Rc::new(RefCell::new(false));
        let flag = reached.clone();
        let handle = r
            .route(
                HttpMethod::Get,
                "",
                Rc::new(|_| Some(Reply::Error(HttpError::new(403, "no")))),
            )
            .unwrap();
        handle.add_post_proc(Rc::new(move |value, _| {
            *flag.borrow_mut() = true;
            Reply::Payload(value)
        }));

        let response = get(&backend, "/foo");
        assert_eq!(response.status, 403);
        assert!(!*reached.borrow());
    }

    #[rstest]
    fn test_finalizer_runs_after_the_chain() {
        let backend = backend();
        let r = router(&backend, "/foo");
        let handle = r
            .route(
                HttpMethod::Get,
                "",
                Rc::new(|_| Some(Reply::Payload(json!(["a"])))),
            )
            .unwrap();
        handle.set_finalizer(Rc::new(|value, _| Reply::Payload(json!({"wrapped": value}))));
        handle.add_post_proc(Rc::new(|value, _| {
            let mut items = value.as_array().cloned().unwrap_or_default();
            items.push(json!("b"));
            Reply::Payload(json!(items))
        }));

        let response = get(&backend, "/foo");
        assert_eq!(body_of(&response), json!({"wrapped": ["a", "b"]}));
    }

    #[rstest]
    fn test_json_body_is_decoded_for_handlers() {
        let backend = backend();
        let r = router(&backend, "/foo");
        r.route(
            HttpMethod::Post,
            "",
            Rc::new(|request| Some(Reply::Payload(request.body.clone().unwrap_or(json!(null))))),
        )
        .unwrap();

        let mut b = backend.borrow_mut();
        b.call_json(HttpMethod::Post, "/foo", &json!({"x": 1}));
        let response = b.flush().pop().unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&response.body).unwrap(), json!({"x": 1}));
    }

    #[rstest]
    fn test_non_json_body_stays_raw() {
        let backend = backend();
        let r = router(&backend, "/foo");
        r.route(
            HttpMethod::Post,
            "",
            Rc::new(|request| {
                assert_eq!(request.body, None);
                Some(Reply::Payload(json!(request.raw_body)))
            }),
        )
        .unwrap();

        let mut b = backend.borrow_mut();
        b.call(
            HttpMethod::Post,
            "/foo",
            Some("plain text"),
            HashMap::from([("Content-Type".to_string(), "text/plain".to_string())]),
        );
        let response = b.flush().pop().unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&response.body).unwrap(), json!("plain text"));
    }

    #[rstest]
    fn test_set_options_value_rejects_unknown_keys() {
        let backend = backend();
        let r = router(&backend, "/foo");
        assert!(r.set_options_value(json!({"debug": true})).is_ok());
        assert!(matches!(
            r.set_options_value(json!({"noSuchOption": 1})),
            Err(ConfigError::Json(_))
        ));
    }

    #[rstest]
    fn test_dropped_router_answers_500() {
        let backend = backend();
        {
            let r = router(&backend, "/foo");
            r.route(
                HttpMethod::Get,
                "",
                Rc::new(|_| Some(Reply::Payload(json!({})))),
            )
            .unwrap();
        }
        let response = get(&backend, "/foo");
        assert_eq!(response.status, 500);
    }
}
