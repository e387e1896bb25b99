//! The discovered krkn-ai configuration document (`krkn-ai.yaml`).
//!
//! Field names and omission rules follow the file krkn-ai writes during
//! discovery, so a load → save round-trip without overrides reproduces the
//! same document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineDocument {
    #[serde(default)]
    pub kubeconfig_file_path: String,
    /// Free-form parameters passed through to scenarios (e.g. `HOST`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub generations: i64,
    #[serde(default)]
    pub population_size: i64,
    #[serde(default)]
    pub wait_duration: i64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub mutation_rate: f64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub scenario_mutation_rate: f64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub crossover_rate: f64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub composition_rate: f64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub population_injection_rate: f64,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub population_injection_size: i64,
    #[serde(default)]
    pub fitness_function: FitnessFunction,
    #[serde(default)]
    pub health_checks: HealthChecks,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default)]
    pub cluster_components: ClusterComponents,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessFunction {
    #[serde(default)]
    pub query: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub include_krkn_failure: bool,
    #[serde(default)]
    pub include_health_check_failure: bool,
    #[serde(default)]
    pub include_health_check_response_time: bool,
    #[serde(default)]
    pub items: Vec<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthChecks {
    #[serde(default)]
    pub stop_watcher_on_failure: bool,
    #[serde(default)]
    pub applications: Vec<HealthCheckApp>,
}

/// One monitored application endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckApp {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default)]
    pub interval: i64,
}

impl HealthCheckApp {
    /// The entry synthesized when an URL override arrives and discovery
    /// found no applications.
    pub fn cluster_health(url: impl Into<String>) -> Self {
        Self {
            name: "cluster-health".to_string(),
            url: url.into(),
            status_code: 200,
            timeout: 4,
            interval: 2,
        }
    }
}

/// One enable flag per scenario family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub application_outages: ScenarioToggle,
    #[serde(default)]
    pub pod_scenarios: ScenarioToggle,
    #[serde(default)]
    pub container_scenarios: ScenarioToggle,
    #[serde(default)]
    pub node_cpu_hog: ScenarioToggle,
    #[serde(default)]
    pub node_memory_hog: ScenarioToggle,
    #[serde(default, skip_serializing_if = "ScenarioToggle::is_disabled")]
    pub node_io_hog: ScenarioToggle,
    #[serde(default)]
    pub time_scenarios: ScenarioToggle,
    #[serde(default)]
    pub network_scenarios: ScenarioToggle,
    #[serde(default)]
    pub dns_outage: ScenarioToggle,
    #[serde(default, skip_serializing_if = "ScenarioToggle::is_disabled")]
    pub syn_flood: ScenarioToggle,
}

impl Scenario {
    /// Names of the enabled scenario families, in document order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("application_outages", &self.application_outages),
            ("pod_scenarios", &self.pod_scenarios),
            ("container_scenarios", &self.container_scenarios),
            ("node_cpu_hog", &self.node_cpu_hog),
            ("node_memory_hog", &self.node_memory_hog),
            ("node_io_hog", &self.node_io_hog),
            ("time_scenarios", &self.time_scenarios),
            ("network_scenarios", &self.network_scenarios),
            ("dns_outage", &self.dns_outage),
            ("syn_flood", &self.syn_flood),
        ]
        .into_iter()
        .filter(|(_, t)| t.enable)
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioToggle {
    #[serde(default)]
    pub enable: bool,
}

impl ScenarioToggle {
    fn is_disabled(&self) -> bool {
        !self.enable
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterComponents {
    #[serde(default)]
    pub namespaces: Vec<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<serde_yaml::Value>,
}

impl BaselineDocument {
    /// Parse a document from YAML text. `origin` is only used for error
    /// context.
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| CoreError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse the document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|source| CoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml, path)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CoreError::Serialize)
    }
}
