//! Typed mock options with an untyped parsing boundary.
//!
//! Options are a fixed, enumerated set of fields. Untyped input (a JSON
//! value, JSON text, or YAML text) goes through a raw serde struct with
//! `deny_unknown_fields`, so unknown keys fail right at the boundary.

use crate::config::error::ConfigError;
use crate::response::DebugInfo;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Custom debug callback: observes one request/response exchange.
pub type DebugFn = Rc<dyn Fn(&DebugInfo<'_>)>;

/// Debug emission mode.
#[derive(Clone, Default)]
pub enum DebugMode {
    /// No debug output
    #[default]
    Off,
    /// Default formatter: one `tracing` event per exchange
    Log,
    /// Caller-supplied callback
    Custom(DebugFn),
}

impl fmt::Debug for DebugMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugMode::Off => f.write_str("Off"),
            DebugMode::Log => f.write_str("Log"),
            DebugMode::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Behavior switches shared by routers and resource stores.
///
/// `None` disables a label-driven behavior. Pagination parameter names
/// default to `skip` and `limit`; pagination itself only activates once
/// `add_index_pagination` is called on a store.
#[derive(Debug, Clone)]
pub struct MockOptions {
    pub debug: DebugMode,
    /// Field name under which `{code, message}` rides along on responses
    pub http_response_info_label: Option<String>,
    /// Envelope key for index results
    pub collection_label: Option<String>,
    /// Envelope key for show/create/update/delete results
    pub singleton_label: Option<String>,
    /// Query parameter holding the number of items to skip
    pub skip_argument_name: Option<String>,
    /// Query parameter holding the maximum number of items to return
    pub limit_argument_name: Option<String>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            debug: DebugMode::Off,
            http_response_info_label: None,
            collection_label: None,
            singleton_label: None,
            skip_argument_name: Some("skip".to_string()),
            limit_argument_name: Some("limit".to_string()),
        }
    }
}

impl MockOptions {
    /// Parse options from an untyped JSON value, merged over the defaults.
    /// Unknown keys are rejected.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let raw: RawOptions = serde_json::from_value(value)?;
        Self::default().merged_with(raw)
    }

    /// Parse an options document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawOptions = serde_json::from_str(text)?;
        Self::default().merged_with(raw)
    }

    /// Parse an options document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawOptions = serde_yaml::from_str(text)?;
        Self::default().merged_with(raw)
    }

    /// Merge an untyped patch over these options, keeping fields the patch
    /// does not mention.
    pub fn merge_value(&self, patch: Value) -> Result<Self, ConfigError> {
        let raw: RawOptions = serde_json::from_value(patch)?;
        self.clone().merged_with(raw)
    }

    fn merged_with(mut self, raw: RawOptions) -> Result<Self, ConfigError> {
        if let Some(flag) = raw.debug {
            self.debug = if flag { DebugMode::Log } else { DebugMode::Off };
        }
        self.http_response_info_label = label_field(
            "httpResponseInfoLabel",
            raw.http_response_info_label,
            self.http_response_info_label,
        )?;
        self.collection_label =
            label_field("collectionLabel", raw.collection_label, self.collection_label)?;
        self.singleton_label =
            label_field("singletonLabel", raw.singleton_label, self.singleton_label)?;
        self.skip_argument_name = label_field(
            "skipArgumentName",
            raw.skip_argument_name,
            self.skip_argument_name,
        )?;
        self.limit_argument_name = label_field(
            "limitArgumentName",
            raw.limit_argument_name,
            self.limit_argument_name,
        )?;
        self.validate()?;
        Ok(self)
    }

    /// Reject label fields that are set but unusable.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("httpResponseInfoLabel", &self.http_response_info_label),
            ("collectionLabel", &self.collection_label),
            ("singletonLabel", &self.singleton_label),
            ("skipArgumentName", &self.skip_argument_name),
            ("limitArgumentName", &self.limit_argument_name),
        ];
        for (name, value) in fields {
            if matches!(value.as_deref(), Some("")) {
                return Err(ConfigError::InvalidOption(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Raw options document: every field optional, `false` disables.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RawOptions {
    debug: Option<bool>,
    http_response_info_label: Option<LabelSetting>,
    collection_label: Option<LabelSetting>,
    singleton_label: Option<LabelSetting>,
    skip_argument_name: Option<LabelSetting>,
    limit_argument_name: Option<LabelSetting>,
}

/// Either `false` (disabled) or a field name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelSetting {
    Flag(bool),
    Name(String),
}

fn label_field(
    name: &str,
    raw: Option<LabelSetting>,
    current: Option<String>,
) -> Result<Option<String>, ConfigError> {
    match raw {
        None => Ok(current),
        Some(LabelSetting::Flag(false)) => Ok(None),
        Some(LabelSetting::Flag(true)) => Err(ConfigError::InvalidOption(format!(
            "{} expects false or a string",
            name
        ))),
        Some(LabelSetting::Name(label)) => Ok(Some(label)),
    }
}
