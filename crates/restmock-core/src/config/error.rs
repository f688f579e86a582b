//! Construction-time error types.

use std::fmt;

/// Configuration error, fatal to the mock being constructed
#[derive(Debug)]
pub enum ConfigError {
    /// Route template does not match the allowed grammar
    InvalidTemplate(String),
    /// Recognized option carrying an unusable value
    InvalidOption(String),
    /// JSON options document failed to parse (including unknown keys)
    Json(serde_json::Error),
    /// YAML options document failed to parse
    Yaml(serde_yaml::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTemplate(raw) => {
                write!(f, "Invalid route template: \"{}\"", raw)
            }
            ConfigError::InvalidOption(detail) => write!(f, "Invalid option: {}", detail),
            ConfigError::Json(e) => write!(f, "JSON options error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML options error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            ConfigError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}
