//! Mock building blocks.
//!
//! - [`Router`]: compiles URL templates and dispatches intercepted calls
//!   to handlers, with per-route post-processing
//! - [`ResourceStore`]: default CRUD semantics over nested storage,
//!   built on the router
//!
//! [`Router`]: router::Router
//! [`ResourceStore`]: resource::ResourceStore

pub mod resource;
pub mod router;
