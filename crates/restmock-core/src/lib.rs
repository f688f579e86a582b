//! Test-double library simulating a RESTful HTTP backend.
//!
//! Intercepts outgoing HTTP calls matching configured URL templates and
//! synthesizes JSON responses from an in-memory data store, so client
//! code can be tested without a real server.
//!
//! Two layers do the work:
//! - [`Router`]: compiles URL templates with wildcard segments into
//!   matchers, dispatches intercepted calls to handlers, and runs
//!   per-route post-processing before serialization
//! - [`ResourceStore`]: index/show/create/update/delete defaults over
//!   recursively nested storage, with sub-resources, response
//!   enveloping, index filtering, and pagination
//!
//! Calls arrive through the [`HttpBackend`] seam; [`LocalBackend`] is a
//! synchronous in-memory transport with a manual flush for test control.
//!
//! ```
//! use restmock_core::{HttpMethod, LocalBackend, MockOptions, ResourceStore};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let backend = Rc::new(RefCell::new(LocalBackend::new()));
//! let books = ResourceStore::new(
//!     "/books",
//!     Some(json!({"1": {"id": 1, "title": "Anathem"}})),
//!     MockOptions::default(),
//!     backend.clone(),
//! )
//! .unwrap();
//! books.add_index_pagination();
//!
//! backend.borrow_mut().call(
//!     HttpMethod::Get,
//!     "/books/1",
//!     None,
//!     Default::default(),
//! );
//! let response = backend.borrow_mut().flush().pop().unwrap().unwrap();
//! assert_eq!(response.status, 200);
//! ```

pub mod backend;
pub mod config;
pub mod matching;
pub mod mocks;
pub mod response;
pub mod types;

pub use backend::{HttpBackend, InterceptedRequest, LocalBackend, RespondFn, WireResponse};
pub use config::error::ConfigError;
pub use config::options::{DebugFn, DebugMode, MockOptions};
pub use matching::{RouteTemplate, UrlMatcher};
pub use mocks::resource::{ActionFn, DefaultAction, ResourceStore};
pub use mocks::router::{HandlerFn, PostProcFn, RouteHandle, Router};
pub use response::{DebugInfo, ResponseBuilder};
pub use types::method::HttpMethod;
pub use types::reply::{HttpError, Reply};
pub use types::request::RequestEnvelope;
