//! Engine construction inputs.

use std::path::PathBuf;
use std::sync::Arc;

use krknai_aggregator::Collector;
use krknai_core::Settings;
use krknai_llm::{LlmClient, ModelOverrides};
use krknai_notify::{NotificationConfig, ReporterRegistry};
use krknai_prompts::PromptRenderer;

use crate::error::{EngineError, Result};

pub const DEFAULT_TOP_SCENARIOS: usize = 10;

/// Per-run parameters. Validated by [`Engine::new`](crate::Engine::new).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub results_dir: PathBuf,
    pub api_key: String,
    pub overrides: ModelOverrides,
    pub notification: Option<NotificationConfig>,
    pub top_scenarios_count: usize,
    /// Directory of YAML templates layered over the built-in ones.
    pub prompt_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(results_dir: impl Into<PathBuf>, api_key: impl Into<String>) -> Self {
        Self {
            results_dir: results_dir.into(),
            api_key: api_key.into(),
            overrides: ModelOverrides::default(),
            notification: None,
            top_scenarios_count: DEFAULT_TOP_SCENARIOS,
            prompt_dir: None,
        }
    }

    /// Config derived from environment settings. Missing results dir or API
    /// key are left empty so [`validate`](Self::validate) reports them.
    pub fn from_settings(settings: &Settings) -> Self {
        let notification = settings
            .slack
            .webhook_url
            .as_ref()
            .map(|url| NotificationConfig::slack(url.clone(), settings.slack.channel.clone()));

        Self {
            results_dir: settings.analysis.results_dir.clone().unwrap_or_default(),
            api_key: settings.llm.api_key.clone().unwrap_or_default(),
            overrides: ModelOverrides::from_settings(&settings.llm),
            notification,
            top_scenarios_count: settings.analysis.top_scenarios,
            prompt_dir: None,
        }
    }

    pub fn with_overrides(mut self, overrides: ModelOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_notification(mut self, notification: NotificationConfig) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_top_scenarios(mut self, count: usize) -> Self {
        self.top_scenarios_count = count;
        self
    }

    pub fn with_prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.results_dir.as_os_str().is_empty() {
            return Err(EngineError::Config("results directory is required".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(EngineError::Config("API key is required".into()));
        }
        Ok(())
    }
}

/// Collaborators the engine drives. Each is owned by exactly one engine.
pub struct EngineDeps {
    pub collector: Arc<dyn Collector>,
    pub renderer: Arc<dyn PromptRenderer>,
    pub client: Arc<dyn LlmClient>,
    pub reporters: ReporterRegistry,
}
