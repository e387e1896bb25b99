//! Reporter trait definition and shared types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ReporterConfig;

/// Errors that can occur during report delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no reporter registered for type '{0}'")]
    UnknownReporter(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{reporter} returned {status}: {body}")]
    Rejected {
        reporter: String,
        status: u16,
        body: String,
    },

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// The finished analysis as handed to reporters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_type: String,
    pub status: String,
    /// Model-written analysis (Markdown)
    pub content: String,
    pub timestamp: String,
    /// Where the full summary was written, if anywhere
    pub summary_path: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AnalysisReport {
    /// Integer metadata value, 0 when absent.
    pub fn count(&self, key: &str) -> u64 {
        self.metadata.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
    }
}

/// A notification sink, addressed by its type tag (e.g. `slack`).
///
/// Reporters hold no per-destination state; everything a delivery needs
/// comes from the [`ReporterConfig`] passed to `send`.
#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    fn reporter_type(&self) -> &str;

    async fn send(&self, report: &AnalysisReport, config: &ReporterConfig) -> Result<(), NotifyError>;
}

/// Result of dispatching a report to a single reporter entry.
#[derive(Debug)]
pub struct DispatchResult {
    pub reporter: String,
    pub success: bool,
    /// Entry was disabled and not attempted
    pub skipped: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DispatchResult {
    pub(crate) fn skipped(reporter: &str) -> Self {
        Self {
            reporter: reporter.to_owned(),
            success: false,
            skipped: true,
            error: None,
            duration_ms: 0,
        }
    }

    pub(crate) fn attempted(reporter: &str, outcome: &Result<(), NotifyError>, duration_ms: u64) -> Self {
        Self {
            reporter: reporter.to_owned(),
            success: outcome.is_ok(),
            skipped: false,
            error: outcome.as_ref().err().map(ToString::to_string),
            duration_ms,
        }
    }
}
