use std::collections::BTreeMap;

use minijinja::Value;
use serde::Serialize;

use krknai_aggregator::CollectedData;

/// Variables handed to a prompt template, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<String, Value>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: &T) {
        self.values.insert(key.into(), Value::from_serialize(value));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// The analysis variables: exactly `Summary`, `TopScenarios`,
    /// `FailedScenarios`, `HealthCheckReport`, `LogArtifacts`, `ConfigSummary`.
    pub fn from_collected(data: &CollectedData) -> Self {
        let mut vars = Self::new();
        vars.insert("Summary", &data.summary);
        vars.insert("TopScenarios", &data.top_scenarios);
        vars.insert("FailedScenarios", &data.failed_scenarios);
        vars.insert("HealthCheckReport", &data.health_check_report);
        vars.insert("LogArtifacts", &data.log_artifacts);
        vars.insert("ConfigSummary", &data.config_summary);
        vars
    }
}
