use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use krknai_core::LogArtifact;

/// Everything gathered from one results directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectedData {
    pub summary: Summary,
    /// Highest fitness first
    pub top_scenarios: Vec<ScenarioResult>,
    pub failed_scenarios: Vec<ScenarioResult>,
    pub health_check_report: HealthCheckReport,
    pub config_summary: Option<ConfigSummary>,
    pub log_artifacts: Vec<LogArtifact>,
}

/// Run-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_scenario_count: usize,
    pub successful_scenario_count: usize,
    pub failed_scenario_count: usize,
    /// Distinct generation ids seen in the results
    pub generations: usize,
    pub max_fitness_score: f64,
    pub avg_fitness_score: f64,
    /// Executions per scenario type
    pub scenario_types: BTreeMap<String, usize>,
}

/// One scenario execution row from `all.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub generation_id: i64,
    pub scenario_id: i64,
    pub scenario: String,
    pub cmd: String,
    pub fitness_score: f64,
    pub krkn_failure_score: f64,
    pub health_check_failure_score: f64,
    pub health_check_response_time_score: f64,
}

impl ScenarioResult {
    /// krkn reports a negative failure score when the scenario itself broke.
    pub fn is_failed(&self) -> bool {
        self.krkn_failure_score < 0.0
    }
}

/// Per-scenario health-check measurements from `health_check_report.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckEntry {
    pub scenario_id: i64,
    pub component_name: String,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub average_response_time: f64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Health-check totals for one monitored component across the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component_name: String,
    pub scenarios_observed: usize,
    pub success_count: u64,
    pub failure_count: u64,
    pub worst_response_time: f64,
    pub average_response_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckReport {
    pub available: bool,
    pub components: Vec<ComponentHealth>,
    /// Rows with at least one failed probe, worst first
    pub failing_entries: Vec<HealthCheckEntry>,
}

/// The parts of the run's configuration worth showing the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub source: String,
    pub generations: i64,
    pub population_size: i64,
    pub wait_duration: i64,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub composition_rate: f64,
    pub enabled_scenarios: Vec<String>,
    pub health_check_apps: Vec<String>,
    pub namespaces: Vec<String>,
    pub fitness_query: Option<String>,
}
