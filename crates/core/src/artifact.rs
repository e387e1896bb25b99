use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A log file produced by a chaos run that the model may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogArtifact {
    /// Path relative to the run's `log/` directory, e.g. `gen_1/scenario_3.log`.
    /// Unique within one results directory.
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}
