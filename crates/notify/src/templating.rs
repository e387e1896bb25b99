//! Minijinja rendering for report messages.
//!
//! Templates see the report as `report` (including `report.metadata`) and
//! the render time as `now`.

use std::fmt;

use krknai_core::format::fixed_decimals;
use minijinja::Environment;

use crate::traits::{AnalysisReport, NotifyError};

#[derive(serde::Serialize)]
struct RenderContext<'a> {
    report: &'a AnalysisReport,
    now: String,
}

/// Renders configured message templates. Filters and functions are
/// registered once; template sources are compiled per call.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_filter("round", fixed_decimals);
        env.add_function("env", lookup_env);
        Self { env }
    }

    pub fn render(&self, source: &str, report: &AnalysisReport) -> Result<String, NotifyError> {
        let ctx = RenderContext {
            report,
            now: chrono::Utc::now().to_rfc3339(),
        };
        self.env.render_str(source, &ctx).map_err(template_error)
    }

    /// Syntax check only; nothing is evaluated.
    pub fn validate(&self, source: &str) -> Result<(), NotifyError> {
        self.env.template_from_str(source).map(drop).map_err(template_error)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

fn template_error(e: minijinja::Error) -> NotifyError {
    NotifyError::Template(e.to_string())
}

/// `{{ env('NAME') }}`; unset renders empty.
fn lookup_env(name: String) -> String {
    std::env::var(&name).unwrap_or_else(|_| {
        tracing::warn!(var = %name, "template referenced an unset environment variable");
        String::new()
    })
}
