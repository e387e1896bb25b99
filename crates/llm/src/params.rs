use serde::{Deserialize, Serialize};

use krknai_core::config::LlmSettings;
use krknai_tool_runtime::SamplingParams;

/// Sampling parameters for one analysis call.
///
/// Prompt templates carry defaults; [`ModelOverrides`] replace individual
/// fields at run time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    8192
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
        }
    }
}

impl From<ModelParams> for SamplingParams {
    fn from(p: ModelParams) -> Self {
        SamplingParams {
            temperature: p.temperature,
            max_tokens: p.max_tokens,
            top_p: p.top_p,
        }
    }
}

/// Caller-supplied replacements for template defaults.
/// Only these three fields can be overridden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOverrides {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl ModelOverrides {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            top_p: settings.top_p,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_tokens.is_none() && self.top_p.is_none()
    }

    /// Return `params` with every present override applied.
    pub fn apply(&self, mut params: ModelParams) -> ModelParams {
        if let Some(t) = self.temperature {
            params.temperature = t;
        }
        if let Some(m) = self.max_tokens {
            params.max_tokens = m;
        }
        if let Some(p) = self.top_p {
            params.top_p = Some(p);
        }
        params
    }
}
