//! Path templates with wildcard segments and their compiled matchers.

use crate::config::error::ConfigError;
use regex::Regex;

/// Wildcard token: matches and captures one `[\w-]+` path segment.
pub const WILDCARD: char = '?';

/// Template grammar: empty, or `/`-led segments that are either literal
/// `[A-Za-z0-9_-]+` or the wildcard token. No trailing slash.
const TEMPLATE_GRAMMAR: &str = r"^(/[A-Za-z0-9_-]+|)(/[A-Za-z0-9_-]+|/\?)*$";

/// Validated path pattern, e.g. `/books/?/chapters`.
///
/// The empty template is permitted so that a sub-route can denote the base
/// path itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate(String);

impl RouteTemplate {
    /// Validate `raw` against the template grammar.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let grammar = Regex::new(TEMPLATE_GRAMMAR).expect("valid regex");
        if !grammar.is_match(raw) {
            return Err(ConfigError::InvalidTemplate(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Concatenate a validated sub-pattern onto this template.
    pub fn join(&self, sub: &RouteTemplate) -> RouteTemplate {
        RouteTemplate(format!("{}{}", self.0, sub.0))
    }
}

/// Compiled matcher for one (method, pattern) registration.
///
/// Wildcards become `([\w-]+)` captures; a trailing query string is
/// tolerated but never participates in matching. Case sensitive.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    regex: Regex,
}

impl UrlMatcher {
    pub fn compile(template: &RouteTemplate) -> Self {
        let mut pattern = String::with_capacity(template.as_str().len() + 16);
        pattern.push('^');
        for c in template.as_str().chars() {
            if c == WILDCARD {
                pattern.push_str(r"([\w-]+)");
            } else {
                pattern.push(c);
            }
        }
        pattern.push_str(r"(?:\?.*)?$");
        // Grammar keeps every literal char regex-safe
        let regex = Regex::new(&pattern).expect("valid regex");
        Self { regex }
    }

    /// Match a URL (path with optional query string) and extract the
    /// wildcard captures in left-to-right order.
    pub fn matches(&self, url: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(url)?;
        Some(
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_owned())
                .collect(),
        )
    }
}
