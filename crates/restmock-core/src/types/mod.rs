//! Core domain types for requests, replies, and HTTP methods.

pub mod method;
pub mod reply;
pub mod request;
