//! Route template validation and URL matching.

mod query;
mod template;

pub use query::{parse_query_string, split_url};
pub use template::{RouteTemplate, UrlMatcher, WILDCARD};
