//! Scans a krkn-ai results directory into [`CollectedData`].
//!
//! Layout read:
//! - `reports/all.csv` (required): one row per scenario execution
//! - `reports/health_check_report.csv` (optional)
//! - `krkn-ai.yaml` or `config.yaml` (optional): the configuration the run used
//! - `log/**/*.log` (optional): exposed to the model through `read_file`

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use krknai_core::{BaselineDocument, LogArtifact};

use crate::error::{AggregatorError, Result};
use crate::model::{
    CollectedData, ComponentHealth, ConfigSummary, HealthCheckEntry, HealthCheckReport,
    ScenarioResult, Summary,
};
use crate::table::Table;

pub const SCENARIO_RESULTS: &str = "reports/all.csv";
pub const HEALTH_CHECK_RESULTS: &str = "reports/health_check_report.csv";
pub const CONFIG_CANDIDATES: [&str; 2] = ["krkn-ai.yaml", "config.yaml"];
pub const LOG_DIR: &str = "log";

/// Produces the data an analysis is based on.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, results_dir: &Path) -> Result<CollectedData>;
}

/// Reads the on-disk layout krkn-ai leaves behind.
#[derive(Debug, Clone)]
pub struct ResultsAggregator {
    top_scenarios_count: usize,
}

impl ResultsAggregator {
    pub fn new(top_scenarios_count: usize) -> Self {
        Self { top_scenarios_count }
    }

    /// Synchronous collection; [`Collector::collect`] runs this on the
    /// blocking pool.
    pub fn collect_blocking(&self, results_dir: &Path) -> Result<CollectedData> {
        if !results_dir.is_dir() {
            return Err(AggregatorError::MissingResultsDir(results_dir.to_path_buf()));
        }

        let scenarios = read_scenarios(&results_dir.join(SCENARIO_RESULTS))?;
        let summary = summarize(&scenarios);

        let failed_scenarios: Vec<ScenarioResult> =
            scenarios.iter().filter(|s| s.is_failed()).cloned().collect();

        let mut top_scenarios = scenarios;
        top_scenarios.sort_by(|a, b| b.fitness_score.total_cmp(&a.fitness_score));
        top_scenarios.truncate(self.top_scenarios_count);

        let health_check_report = read_health_checks(&results_dir.join(HEALTH_CHECK_RESULTS))?;
        let config_summary = read_config_summary(results_dir);
        let log_artifacts = find_log_artifacts(&results_dir.join(LOG_DIR));

        info!(
            dir = %results_dir.display(),
            total = summary.total_scenario_count,
            failed = summary.failed_scenario_count,
            generations = summary.generations,
            logs = log_artifacts.len(),
            "results collected"
        );

        Ok(CollectedData {
            summary,
            top_scenarios,
            failed_scenarios,
            health_check_report,
            config_summary,
            log_artifacts,
        })
    }
}

impl Default for ResultsAggregator {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl Collector for ResultsAggregator {
    async fn collect(&self, results_dir: &Path) -> Result<CollectedData> {
        let this = self.clone();
        let dir = results_dir.to_path_buf();
        tokio::task::spawn_blocking(move || this.collect_blocking(&dir))
            .await
            .map_err(|e| AggregatorError::Task(e.to_string()))?
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).map_err(|source| AggregatorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Table::parse(&text).map_err(|e| AggregatorError::Malformed {
        path: path.to_path_buf(),
        line: e.line,
        message: e.message,
    })
}

fn require(table: &Table, path: &Path, column: &'static str) -> Result<usize> {
    table.column(column).ok_or_else(|| AggregatorError::MissingColumn {
        path: path.to_path_buf(),
        column,
    })
}

fn read_scenarios(path: &Path) -> Result<Vec<ScenarioResult>> {
    if !path.is_file() {
        return Err(AggregatorError::MissingResults(path.to_path_buf()));
    }
    let table = read_table(path)?;

    let scenario_id = require(&table, path, "scenario_id")?;
    let fitness = require(&table, path, "fitness_score")?;
    let generation = table.column("generation_id");
    let scenario = table.column("scenario");
    let cmd = table.column("cmd");
    let krkn_failure = table.column("krkn_failure_score");
    let hc_failure = table.column("health_check_failure_score");
    let hc_response = table.column("health_check_response_time_score");

    let mut results = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let parsed = (|| {
            Ok::<_, String>(ScenarioResult {
                generation_id: row.parse_or(generation, 0)?,
                scenario_id: row.parse_or(Some(scenario_id), 0)?,
                scenario: scenario.map(|i| row.get(i).to_string()).unwrap_or_default(),
                cmd: cmd.map(|i| row.get(i).to_string()).unwrap_or_default(),
                fitness_score: row.parse_or(Some(fitness), 0.0)?,
                krkn_failure_score: row.parse_or(krkn_failure, 0.0)?,
                health_check_failure_score: row.parse_or(hc_failure, 0.0)?,
                health_check_response_time_score: row.parse_or(hc_response, 0.0)?,
            })
        })();

        match parsed {
            Ok(r) => results.push(r),
            Err(message) => {
                warn!(path = %path.display(), line = row.line, %message, "skipping scenario row")
            }
        }
    }

    debug!(path = %path.display(), rows = results.len(), "scenario results parsed");
    Ok(results)
}

fn summarize(scenarios: &[ScenarioResult]) -> Summary {
    let total = scenarios.len();
    let failed = scenarios.iter().filter(|s| s.is_failed()).count();
    let generations: HashSet<i64> = scenarios.iter().map(|s| s.generation_id).collect();

    let mut scenario_types = BTreeMap::new();
    for s in scenarios {
        let key = if s.scenario.is_empty() { "unknown" } else { s.scenario.as_str() };
        *scenario_types.entry(key.to_string()).or_insert(0) += 1;
    }

    let max_fitness_score = scenarios
        .iter()
        .map(|s| s.fitness_score)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0);
    let avg_fitness_score = if total == 0 {
        0.0
    } else {
        scenarios.iter().map(|s| s.fitness_score).sum::<f64>() / total as f64
    };

    Summary {
        total_scenario_count: total,
        successful_scenario_count: total - failed,
        failed_scenario_count: failed,
        generations: generations.len(),
        max_fitness_score,
        avg_fitness_score,
        scenario_types,
    }
}

fn read_health_checks(path: &Path) -> Result<HealthCheckReport> {
    if !path.is_file() {
        debug!(path = %path.display(), "no health check report");
        return Ok(HealthCheckReport::default());
    }
    let table = read_table(path)?;

    let component = require(&table, path, "component_name")?;
    let scenario_id = table.column("scenario_id");
    let min_rt = table.column("min_response_time");
    let max_rt = table.column("max_response_time");
    let avg_rt = table.column("average_response_time");
    let success = table.column("success_count");
    let failure = table.column("failure_count");

    let mut entries = Vec::new();
    for row in table.rows() {
        let parsed = (|| {
            Ok::<_, String>(HealthCheckEntry {
                scenario_id: row.parse_or(scenario_id, 0)?,
                component_name: row.get(component).to_string(),
                min_response_time: row.parse_or(min_rt, 0.0)?,
                max_response_time: row.parse_or(max_rt, 0.0)?,
                average_response_time: row.parse_or(avg_rt, 0.0)?,
                success_count: row.parse_or(success, 0)?,
                failure_count: row.parse_or(failure, 0)?,
            })
        })();
        match parsed {
            Ok(e) => entries.push(e),
            Err(message) => {
                warn!(path = %path.display(), line = row.line, %message, "skipping health check row")
            }
        }
    }

    // component order follows first appearance in the report
    let mut components: Vec<ComponentHealth> = Vec::new();
    let mut weighted_rt: Vec<f64> = Vec::new();
    for e in &entries {
        let idx = match components.iter().position(|c| c.component_name == e.component_name) {
            Some(i) => i,
            None => {
                components.push(ComponentHealth {
                    component_name: e.component_name.clone(),
                    scenarios_observed: 0,
                    success_count: 0,
                    failure_count: 0,
                    worst_response_time: 0.0,
                    average_response_time: 0.0,
                });
                weighted_rt.push(0.0);
                components.len() - 1
            }
        };
        let c = &mut components[idx];
        c.scenarios_observed += 1;
        c.success_count += e.success_count;
        c.failure_count += e.failure_count;
        c.worst_response_time = c.worst_response_time.max(e.max_response_time);
        weighted_rt[idx] += e.average_response_time;
    }
    for (c, total) in components.iter_mut().zip(weighted_rt) {
        c.average_response_time = total / c.scenarios_observed as f64;
    }

    let mut failing_entries: Vec<HealthCheckEntry> =
        entries.into_iter().filter(|e| e.failure_count > 0).collect();
    failing_entries.sort_by(|a, b| b.failure_count.cmp(&a.failure_count));

    Ok(HealthCheckReport {
        available: true,
        components,
        failing_entries,
    })
}

fn read_config_summary(results_dir: &Path) -> Option<ConfigSummary> {
    let path = CONFIG_CANDIDATES
        .iter()
        .map(|name| results_dir.join(name))
        .find(|p| p.is_file())?;

    match BaselineDocument::load(&path) {
        Ok(doc) => Some(summarize_config(&doc, &path)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable run configuration");
            None
        }
    }
}

fn summarize_config(doc: &BaselineDocument, path: &Path) -> ConfigSummary {
    let namespaces = doc
        .cluster_components
        .namespaces
        .iter()
        .filter_map(|ns| match ns {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Mapping(m) => m
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        })
        .collect();

    ConfigSummary {
        source: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        generations: doc.generations,
        population_size: doc.population_size,
        wait_duration: doc.wait_duration,
        mutation_rate: doc.mutation_rate,
        crossover_rate: doc.crossover_rate,
        composition_rate: doc.composition_rate,
        enabled_scenarios: doc.scenario.enabled().into_iter().map(String::from).collect(),
        health_check_apps: doc
            .health_checks
            .applications
            .iter()
            .map(|a| format!("{} ({})", a.name, a.url))
            .collect(),
        namespaces,
        fitness_query: Some(doc.fitness_function.query.clone()).filter(|q| !q.is_empty()),
    }
}

fn find_log_artifacts(log_dir: &Path) -> Vec<LogArtifact> {
    if !log_dir.is_dir() {
        return Vec::new();
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(log_dir).sort_by_file_name().into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "walkdir error, skipping entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path: PathBuf = entry.path().to_path_buf();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        let name = path
            .strip_prefix(log_dir)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        artifacts.push(LogArtifact {
            name,
            path,
            size_bytes,
        });
    }
    artifacts
}
