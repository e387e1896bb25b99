//! Overlay run overrides onto a discovered baseline document.
//!
//! The merge is best-effort per field: an override that does not parse
//! under its type is logged and skipped, the baseline value is kept, and the
//! remaining overrides still apply.

use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{error, info};

use crate::baseline::{BaselineDocument, HealthCheckApp, ScenarioToggle};
use crate::error::{CoreError, Result};
use crate::run_config::{parse_bool, present, RunConfig};

/// Name of the secondary copy written next to the merged document.
pub const UPDATED_COPY_NAME: &str = "krkn-ai-updated.yaml";

/// Key under which the host override lands in `parameters`.
pub const HOST_PARAMETER: &str = "HOST";

/// An override that was present but could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOverride {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Baseline fields that received an override.
    pub applied: Vec<&'static str>,
    pub skipped: Vec<SkippedOverride>,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }

    fn skip(&mut self, field: &'static str, value: &str, reason: impl Display) {
        error!(field, value, error = %reason, "invalid override value, keeping baseline");
        self.skipped.push(SkippedOverride {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }
}

fn apply_parsed<T>(
    report: &mut MergeReport,
    field: &'static str,
    value: &Option<String>,
    target: &mut T,
) where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = present(value) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(parsed) => {
            info!(field, from = %target, to = %parsed, "updating baseline field");
            *target = parsed;
            report.applied.push(field);
        }
        Err(e) => report.skip(field, raw, e),
    }
}

fn apply_toggle(
    report: &mut MergeReport,
    scenario: &'static str,
    value: &Option<String>,
    toggle: &mut ScenarioToggle,
) {
    let Some(raw) = present(value) else {
        return;
    };
    match parse_bool(raw) {
        Some(enable) => {
            info!(scenario, from = toggle.enable, to = enable, "updated scenario toggle");
            toggle.enable = enable;
            report.applied.push(scenario);
        }
        None => report.skip(scenario, raw, "invalid boolean value for scenario"),
    }
}

/// Apply every present override to `doc` in place.
pub fn apply_overrides(overrides: &RunConfig, doc: &mut BaselineDocument) -> MergeReport {
    let mut report = MergeReport::default();

    apply_parsed(&mut report, "generations", &overrides.generations, &mut doc.generations);
    apply_parsed(
        &mut report,
        "population_size",
        &overrides.population_size,
        &mut doc.population_size,
    );
    apply_parsed(
        &mut report,
        "wait_duration",
        &overrides.wait_duration,
        &mut doc.wait_duration,
    );
    apply_parsed(
        &mut report,
        "composition_rate",
        &overrides.composition_rate,
        &mut doc.composition_rate,
    );

    let s = &mut doc.scenario;
    apply_toggle(&mut report, "pod_scenarios", &overrides.enable_pod_scenarios, &mut s.pod_scenarios);
    apply_toggle(
        &mut report,
        "container_scenarios",
        &overrides.enable_container_scenarios,
        &mut s.container_scenarios,
    );
    apply_toggle(&mut report, "node_cpu_hog", &overrides.enable_node_cpu_hog, &mut s.node_cpu_hog);
    apply_toggle(
        &mut report,
        "node_memory_hog",
        &overrides.enable_node_memory_hog,
        &mut s.node_memory_hog,
    );
    apply_toggle(&mut report, "node_io_hog", &overrides.enable_node_io_hog, &mut s.node_io_hog);
    apply_toggle(
        &mut report,
        "network_scenarios",
        &overrides.enable_network_scenarios,
        &mut s.network_scenarios,
    );
    apply_toggle(&mut report, "dns_outage", &overrides.enable_dns_outage, &mut s.dns_outage);
    apply_toggle(
        &mut report,
        "time_scenarios",
        &overrides.enable_time_scenarios,
        &mut s.time_scenarios,
    );

    if let Some(query) = present(&overrides.fitness_function_query) {
        info!(to = query, "updating fitness_function.query");
        doc.fitness_function.query = query.to_string();
        report.applied.push("fitness_function.query");
    }

    if let Some(url) = present(&overrides.health_checks_url) {
        match doc.health_checks.applications.first_mut() {
            Some(first) => {
                info!(app = %first.name, from = %first.url, to = url, "updated health check URL");
                first.url = url.to_string();
            }
            None => {
                info!(url, "created default health check application");
                doc.health_checks.applications = vec![HealthCheckApp::cluster_health(url)];
            }
        }
        report.applied.push("health_checks.applications");
    }

    if let Some(host) = present(&overrides.host) {
        info!(to = host, "updating HOST parameter");
        doc.parameters.insert(
            HOST_PARAMETER.to_string(),
            serde_yaml::Value::String(host.to_string()),
        );
        report.applied.push("parameters.HOST");
    }

    report
}

/// Load the document at `path`, apply `overrides`, and write it back.
///
/// The rewritten document replaces `path`; a copy also goes to
/// [`UPDATED_COPY_NAME`] in the same directory. Only the primary write can
/// fail the merge.
pub fn merge_into_file(overrides: &RunConfig, path: &Path) -> Result<MergeReport> {
    info!(file = %path.display(), "updating krkn-ai config with run parameters");

    let mut doc = BaselineDocument::load(path)?;
    let report = apply_overrides(overrides, &mut doc);
    let yaml = doc.to_yaml()?;

    fs::write(path, &yaml).map_err(|source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let copy_path = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(UPDATED_COPY_NAME);
    match fs::write(&copy_path, &yaml) {
        Ok(()) => info!(path = %copy_path.display(), "wrote copy of updated config"),
        Err(e) => error!(path = %copy_path.display(), error = %e, "failed to write updated config copy"),
    }

    info!(
        file = %path.display(),
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "krkn-ai config updated"
    );
    Ok(report)
}
