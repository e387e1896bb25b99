//! The materialized outcome of an analysis and its on-disk summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use krknai_aggregator::{CollectedData, ScenarioResult};
use krknai_llm::LlmResponse;
use krknai_notify::AnalysisReport;
use krknai_tool_runtime::{ToolCall, READ_FILE_TOOL};

use crate::error::{EngineError, Result};

pub const ANALYSIS_TYPE: &str = "krknai";
pub const SUMMARY_DIR: &str = "llm-analysis";
pub const SUMMARY_FILE: &str = "summary.yaml";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub status: String,
    pub content: String,
    pub prompt: String,
    pub metadata: BTreeMap<String, Value>,
    pub error: Option<String>,
    /// In the order the model requested them.
    pub tool_calls: Vec<ToolCall>,
    pub timestamp: DateTime<Utc>,
    pub summary_path: PathBuf,
}

impl AnalysisResult {
    pub fn completed(
        data: &CollectedData,
        prompt: String,
        response: LlmResponse,
        summary_path: PathBuf,
    ) -> Self {
        let metadata = build_metadata(data, &response.tool_calls);
        Self {
            status: STATUS_COMPLETED.to_string(),
            content: response.content,
            prompt,
            metadata,
            error: None,
            tool_calls: response.tool_calls,
            timestamp: Utc::now(),
            summary_path,
        }
    }

    pub fn to_report(&self) -> AnalysisReport {
        AnalysisReport {
            analysis_type: ANALYSIS_TYPE.to_string(),
            status: self.status.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.to_rfc3339(),
            summary_path: Some(self.summary_path.display().to_string()),
            metadata: self.metadata.clone(),
        }
    }
}

pub fn summary_path(results_dir: &Path) -> PathBuf {
    results_dir.join(SUMMARY_DIR).join(SUMMARY_FILE)
}

fn build_metadata(data: &CollectedData, tool_calls: &[ToolCall]) -> BTreeMap<String, Value> {
    let s = &data.summary;
    let artifacts_examined = tool_calls.iter().filter(|c| c.name == READ_FILE_TOOL).count();

    BTreeMap::from([
        ("analysis_type".to_string(), json!(ANALYSIS_TYPE)),
        ("total_scenarios".to_string(), json!(s.total_scenario_count)),
        ("successful_scenarios".to_string(), json!(s.successful_scenario_count)),
        ("failed_scenarios".to_string(), json!(s.failed_scenario_count)),
        ("generations".to_string(), json!(s.generations)),
        ("max_fitness_score".to_string(), json!(s.max_fitness_score)),
        ("artifacts_examined".to_string(), json!(artifacts_examined)),
        ("tool_calls".to_string(), json!(tool_calls.len())),
    ])
}

#[derive(Serialize)]
struct RunSummary<'a> {
    total_scenarios: usize,
    successful_scenarios: usize,
    failed_scenarios: usize,
    generations: usize,
    max_fitness_score: f64,
    avg_fitness_score: f64,
    scenario_types: &'a BTreeMap<String, usize>,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    timestamp: String,
    analysis_type: &'a str,
    run_summary: RunSummary<'a>,
    top_scenarios: &'a [ScenarioResult],
    failed_scenarios: &'a [ScenarioResult],
    status: &'a str,
    prompt: &'a str,
    response: &'a str,
    metadata: &'a BTreeMap<String, Value>,
    /// Empty string when the analysis succeeded.
    error: &'a str,
}

pub fn render_summary(result: &AnalysisResult, data: &CollectedData) -> Result<String> {
    let s = &data.summary;
    let doc = SummaryDocument {
        timestamp: result.timestamp.to_rfc3339(),
        analysis_type: ANALYSIS_TYPE,
        run_summary: RunSummary {
            total_scenarios: s.total_scenario_count,
            successful_scenarios: s.successful_scenario_count,
            failed_scenarios: s.failed_scenario_count,
            generations: s.generations,
            max_fitness_score: s.max_fitness_score,
            avg_fitness_score: s.avg_fitness_score,
            scenario_types: &s.scenario_types,
        },
        top_scenarios: &data.top_scenarios,
        failed_scenarios: &data.failed_scenarios,
        status: &result.status,
        prompt: &result.prompt,
        response: &result.content,
        metadata: &result.metadata,
        error: result.error.as_deref().unwrap_or_default(),
    };
    Ok(serde_yaml::to_string(&doc)?)
}

/// Write `contents` to `path` via a temporary sibling so an interrupted
/// write never leaves a truncated file behind.
pub async fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let persist_err = |source: std::io::Error| EngineError::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(persist_err)?;
    }

    let tmp = path.with_extension("yaml.tmp");
    if let Err(source) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(persist_err(source));
    }
    tokio::fs::rename(&tmp, path).await.map_err(persist_err)
}
