//! Notification configuration.
//!
//! ```yaml
//! enabled: true
//! reporters:
//!   - type: slack
//!     settings:
//!       webhook_url: ${SLACK_WEBHOOK_URL}
//!       channel: "#chaos"
//!   - type: webhook
//!     enabled: false
//!     settings:
//!       url: https://hooks.internal/krknai
//!       header.Authorization: Bearer ${HOOK_TOKEN}
//! ```
//!
//! Setting values may reference environment variables as `${VAR_NAME}`;
//! references are resolved when a reporter reads the setting.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::templating::TemplateRenderer;
use crate::traits::NotifyError;

/// Settings holding a minijinja template, checked when a config is loaded.
const TEMPLATE_SETTINGS: [&str; 2] = ["message_template", "body_template"];

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub reporters: Vec<ReporterConfig>,
}

impl NotificationConfig {
    pub fn load(path: &Path) -> Result<Self, NotifyError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| NotifyError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.check_templates()?;
        Ok(config)
    }

    /// Syntax-check every template setting.
    pub fn check_templates(&self) -> Result<(), NotifyError> {
        let renderer = TemplateRenderer::new();
        for entry in &self.reporters {
            for key in TEMPLATE_SETTINGS {
                let Some(source) = entry.settings.get(key) else { continue };
                renderer.validate(source).map_err(|e| {
                    NotifyError::Config(format!("{} reporter: invalid {key}: {e}", entry.reporter_type))
                })?;
            }
        }
        Ok(())
    }

    /// A single enabled Slack entry.
    pub fn slack(webhook_url: impl Into<String>, channel: Option<String>) -> Self {
        let mut settings = BTreeMap::from([("webhook_url".to_string(), webhook_url.into())]);
        if let Some(channel) = channel {
            settings.insert("channel".to_string(), channel);
        }
        Self {
            enabled: true,
            reporters: vec![ReporterConfig {
                reporter_type: "slack".to_string(),
                enabled: true,
                settings,
            }],
        }
    }
}

/// One configured destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterConfig {
    #[serde(rename = "type")]
    pub reporter_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl ReporterConfig {
    pub fn new(reporter_type: impl Into<String>) -> Self {
        Self {
            reporter_type: reporter_type.into(),
            enabled: true,
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Resolved value of an optional setting. Empty values count as absent.
    pub fn setting(&self, key: &str) -> Result<Option<String>, NotifyError> {
        match self.settings.get(key) {
            Some(raw) if !raw.trim().is_empty() => resolve_env_vars(raw).map(Some),
            _ => Ok(None),
        }
    }

    /// Resolved value of a required setting.
    pub fn require(&self, key: &str) -> Result<String, NotifyError> {
        self.setting(key)?.ok_or_else(|| {
            NotifyError::Config(format!("{} reporter requires '{key}'", self.reporter_type))
        })
    }

    /// Resolved settings whose key starts with `prefix`, prefix stripped.
    pub fn prefixed(&self, prefix: &str) -> Result<Vec<(String, String)>, NotifyError> {
        self.settings
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(prefix).map(|name| (name, v)))
            .map(|(name, v)| resolve_env_vars(v).map(|value| (name.to_string(), value)))
            .collect()
    }
}

/// Expand every `${NAME}` in `input` from the process environment.
///
/// An unset variable or a `${` with no closing brace is a config error.
pub fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or_else(|| {
            NotifyError::Config(format!("unclosed env var reference in: {input}"))
        })?;
        let name = &after[..close];
        let value = std::env::var(name)
            .map_err(|_| NotifyError::Config(format!("env var not found: {name}")))?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
