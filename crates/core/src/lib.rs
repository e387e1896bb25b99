pub mod artifact;
pub mod baseline;
pub mod config;
pub mod error;
pub mod format;
pub mod merge;
pub mod run_config;

pub use artifact::LogArtifact;
pub use baseline::{BaselineDocument, HealthCheckApp, ScenarioToggle};
pub use config::Settings;
pub use error::*;
pub use merge::{apply_overrides, merge_into_file, MergeReport};
pub use run_config::{RunConfig, RunMode, ValidationError};
