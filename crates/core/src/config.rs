use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Pick up a `.env` in the working directory, if there is one.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

/// Environment lookups scoped to a profile.
///
/// With a profile such as `CI`, `GEMINI_MODEL` is read from
/// `CI_GEMINI_MODEL` when that is set and non-empty, else from `GEMINI_MODEL`.
#[derive(Debug, Clone, Copy)]
struct ProfiledEnv<'a> {
    profile: &'a str,
}

impl<'a> ProfiledEnv<'a> {
    fn new(profile: &'a str) -> Self {
        Self { profile }
    }

    fn get(&self, key: &str) -> Option<String> {
        let non_empty = |k: &str| env::var(k).ok().filter(|v| !v.is_empty());
        if self.profile.is_empty() {
            return non_empty(key);
        }
        non_empty(&format!("{}_{key}", self.profile)).or_else(|| non_empty(key))
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    /// Unparseable values are logged and treated as unset.
    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        raw.parse()
            .inspect_err(|_| warn!(key, value = %raw, "ignoring unparseable env value"))
            .ok()
    }
}

// ── Top-level settings ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Active profile name (empty = default).
    pub profile: String,
    pub analysis: AnalysisSettings,
    pub llm: LlmSettings,
    pub slack: SlackSettings,
}

impl Settings {
    /// Build settings from environment variables (call `load_dotenv()` first).
    /// Profile is read from `KRKNAI_PROFILE`. When set (e.g. `CI`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env::var("KRKNAI_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build settings for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let profile = profile.trim().to_uppercase();
        let env = ProfiledEnv::new(&profile);
        Self {
            analysis: AnalysisSettings::read(env),
            llm: LlmSettings::read(env),
            slack: SlackSettings::read(env),
            profile,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Startup log line per section. Secrets are reported as set or unset only.
    pub fn log_summary(&self) {
        info!(profile = self.profile_label(), "settings loaded");
        info!(
            results_dir = ?self.analysis.results_dir,
            top_scenarios = self.analysis.top_scenarios,
            "analysis settings"
        );
        info!(
            model = %self.llm.model,
            api_key_set = self.llm.is_configured(),
            max_tool_iterations = self.llm.max_tool_iterations,
            "llm settings"
        );
        info!(webhook_set = self.slack.is_configured(), "slack settings");
    }
}

// ── Analysis ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub results_dir: Option<PathBuf>,
    pub top_scenarios: usize,
}

impl AnalysisSettings {
    fn read(env: ProfiledEnv<'_>) -> Self {
        Self {
            results_dir: env.get("KRKNAI_RESULTS_DIR").map(PathBuf::from),
            top_scenarios: env.parse("KRKNAI_TOP_SCENARIOS").unwrap_or(10),
        }
    }
}

// ── LLM (Gemini) ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Overrides for the template defaults; `None` keeps the template value.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub max_tool_iterations: usize,
}

impl LlmSettings {
    fn read(env: ProfiledEnv<'_>) -> Self {
        Self {
            api_key: env.get("GEMINI_API_KEY"),
            model: env.get_or("GEMINI_MODEL", "gemini-2.5-pro"),
            base_url: env.get_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
            temperature: env.parse("KRKNAI_LLM_TEMPERATURE"),
            max_tokens: env.parse("KRKNAI_LLM_MAX_TOKENS"),
            top_p: env.parse("KRKNAI_LLM_TOP_P"),
            max_tool_iterations: env.parse("KRKNAI_MAX_TOOL_ITERATIONS").unwrap_or(10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Slack ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSettings {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
}

impl SlackSettings {
    fn read(env: ProfiledEnv<'_>) -> Self {
        Self {
            webhook_url: env.get("SLACK_WEBHOOK_URL"),
            channel: env.get("SLACK_CHANNEL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}
