//! Caller-supplied run overrides and their validation.
//!
//! Every override is an optional string: CI job parameters arrive as text
//! and an empty value means "keep whatever discovery produced". Parsing into
//! the target type happens in [`RunConfig::validate`] (strict, first error
//! wins) and again in the merger (best-effort, per field).

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Whether krkn-ai should only discover the cluster or execute a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Discover,
    Run,
}

impl FromStr for RunMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discover" => Ok(Self::Discover),
            "run" => Ok(Self::Run),
            other => Err(ValidationError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discover => f.write_str("discover"),
            Self::Run => f.write_str("run"),
        }
    }
}

/// Errors returned by [`RunConfig::validate`]. Only the first violation is
/// reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid mode: {0} (must be 'discover' or 'run')")]
    InvalidMode(String),

    #[error("invalid {field} value: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid boolean value for {field}: {value}")]
    InvalidBool { field: &'static str, value: String },
}

/// Override parameters for a krkn-ai run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: String,

    // Genetic algorithm parameters
    #[serde(deserialize_with = "opt_scalar")]
    pub generations: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub population_size: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub wait_duration: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub composition_rate: Option<String>,

    // Scenario toggles
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_pod_scenarios: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_container_scenarios: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_node_cpu_hog: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_node_memory_hog: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_node_io_hog: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_network_scenarios: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_dns_outage: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub enable_time_scenarios: Option<String>,

    #[serde(deserialize_with = "opt_scalar")]
    pub fitness_function_query: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub health_checks_url: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub host: Option<String>,
}

/// Accept any YAML scalar for an override so `generations: 5` and
/// `generations: "5"` mean the same thing.
fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar override, got {other:?}"
        ))),
    }
}

/// Returns the value when it is set and non-empty.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse a boolean the way CI parameters spell them.
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl RunConfig {
    /// Convenience constructor with only the mode set.
    pub fn with_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            ..Self::default()
        }
    }

    /// Read overrides from `KRKN_AI_*` environment variables.
    ///
    /// Unset and empty variables both map to `None`.
    pub fn from_env() -> Self {
        fn var(key: &str) -> Option<String> {
            env::var(key).ok().filter(|s| !s.is_empty())
        }

        Self {
            mode: var("KRKN_AI_MODE").unwrap_or_default(),
            generations: var("KRKN_AI_GENERATIONS"),
            population_size: var("KRKN_AI_POPULATION_SIZE"),
            wait_duration: var("KRKN_AI_WAIT_DURATION"),
            composition_rate: var("KRKN_AI_COMPOSITION_RATE"),
            enable_pod_scenarios: var("KRKN_AI_ENABLE_POD_SCENARIOS"),
            enable_container_scenarios: var("KRKN_AI_ENABLE_CONTAINER_SCENARIOS"),
            enable_node_cpu_hog: var("KRKN_AI_ENABLE_NODE_CPU_HOG"),
            enable_node_memory_hog: var("KRKN_AI_ENABLE_NODE_MEMORY_HOG"),
            enable_node_io_hog: var("KRKN_AI_ENABLE_NODE_IO_HOG"),
            enable_network_scenarios: var("KRKN_AI_ENABLE_NETWORK_SCENARIOS"),
            enable_dns_outage: var("KRKN_AI_ENABLE_DNS_OUTAGE"),
            enable_time_scenarios: var("KRKN_AI_ENABLE_TIME_SCENARIOS"),
            fitness_function_query: var("KRKN_AI_FITNESS_FUNCTION_QUERY"),
            health_checks_url: var("KRKN_AI_HEALTH_CHECKS_URL"),
            host: var("KRKN_AI_HOST"),
        }
    }

    /// Parsed run mode.
    pub fn mode(&self) -> Result<RunMode, ValidationError> {
        self.mode.parse()
    }

    /// Integer overrides in validation order.
    pub(crate) fn integer_fields(&self) -> [(&'static str, &Option<String>); 3] {
        [
            ("generations", &self.generations),
            ("population_size", &self.population_size),
            ("wait_duration", &self.wait_duration),
        ]
    }

    /// Scenario toggle overrides in validation order, keyed by the
    /// parameter name.
    pub(crate) fn toggle_fields(&self) -> [(&'static str, &Option<String>); 8] {
        [
            ("enable_pod_scenarios", &self.enable_pod_scenarios),
            ("enable_container_scenarios", &self.enable_container_scenarios),
            ("enable_node_cpu_hog", &self.enable_node_cpu_hog),
            ("enable_node_memory_hog", &self.enable_node_memory_hog),
            ("enable_node_io_hog", &self.enable_node_io_hog),
            ("enable_network_scenarios", &self.enable_network_scenarios),
            ("enable_dns_outage", &self.enable_dns_outage),
            ("enable_time_scenarios", &self.enable_time_scenarios),
        ]
    }

    /// Check mode and every present typed field. No I/O.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.mode()?;

        for (field, value) in self.integer_fields() {
            if let Some(v) = present(value) {
                v.parse::<i64>().map_err(|_| ValidationError::InvalidNumber {
                    field,
                    value: v.to_string(),
                })?;
            }
        }

        if let Some(v) = present(&self.composition_rate) {
            v.parse::<f64>().map_err(|_| ValidationError::InvalidNumber {
                field: "composition_rate",
                value: v.to_string(),
            })?;
        }

        for (field, value) in self.toggle_fields() {
            if let Some(v) = present(value) {
                if parse_bool(v).is_none() {
                    return Err(ValidationError::InvalidBool {
                        field,
                        value: v.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_mode() {
        let err = RunConfig::with_mode("destroy").validate().unwrap_err();
        assert_eq!(err, ValidationError::InvalidMode("destroy".into()));
        assert!(err.to_string().contains("must be 'discover' or 'run'"));
    }

    #[test]
    fn accepts_known_modes_with_empty_fields() {
        assert!(RunConfig::with_mode("discover").validate().is_ok());
        assert!(RunConfig::with_mode("run").validate().is_ok());
    }

    #[test]
    fn empty_mode_is_invalid() {
        assert!(RunConfig::default().validate().is_err());
    }

    #[test]
    fn rejects_non_integer_generations() {
        let cfg = RunConfig {
            generations: Some("ten".into()),
            ..RunConfig::with_mode("run")
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidNumber {
                field: "generations",
                value: "ten".into()
            }
        );
    }

    #[test]
    fn empty_string_counts_as_absent() {
        let cfg = RunConfig {
            population_size: Some(String::new()),
            enable_dns_outage: Some(String::new()),
            ..RunConfig::with_mode("run")
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn reports_first_violation_only() {
        let cfg = RunConfig {
            wait_duration: Some("soon".into()),
            enable_pod_scenarios: Some("maybe".into()),
            ..RunConfig::with_mode("run")
        };
        match cfg.validate().unwrap_err() {
            ValidationError::InvalidNumber { field, .. } => assert_eq!(field, "wait_duration"),
            other => panic!("expected number error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_boolean_toggle() {
        let cfg = RunConfig {
            enable_time_scenarios: Some("yes".into()),
            ..RunConfig::with_mode("discover")
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid boolean value for enable_time_scenarios: yes"
        );
    }

    #[test]
    fn rejects_bad_composition_rate() {
        let cfg = RunConfig {
            composition_rate: Some("0.3.1".into()),
            ..RunConfig::with_mode("run")
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_bool_spellings() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRuE"), None);
    }

    #[test]
    fn deserializes_from_yaml() {
        let yaml = "mode: run\ngenerations: \"5\"\nenable_pod_scenarios: \"false\"\n";
        let cfg: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.mode().unwrap(), RunMode::Run);
        assert_eq!(cfg.generations.as_deref(), Some("5"));
        assert!(cfg.host.is_none());
    }

    #[test]
    fn accepts_unquoted_scalars() {
        let yaml = "mode: discover\ngenerations: 5\ncomposition_rate: 0.25\nenable_dns_outage: true\n";
        let cfg: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.generations.as_deref(), Some("5"));
        assert_eq!(cfg.composition_rate.as_deref(), Some("0.25"));
        assert_eq!(cfg.enable_dns_outage.as_deref(), Some("true"));
        assert!(cfg.validate().is_ok());
    }
}
