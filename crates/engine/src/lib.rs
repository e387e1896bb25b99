//! Post-run analysis of a krkn-ai results directory.
//!
//! [`Engine::run`] walks a fixed sequence of stages: collect the results,
//! render the analysis prompt, call the model with read access to the run's
//! log files, write `llm-analysis/summary.yaml`, then notify.

pub mod config;
pub mod engine;
pub mod error;
pub mod result;
pub mod stage;

pub use config::{EngineConfig, EngineDeps, DEFAULT_TOP_SCENARIOS};
pub use engine::Engine;
pub use error::EngineError;
pub use result::{summary_path, AnalysisResult};
pub use stage::Stage;
