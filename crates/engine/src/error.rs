use std::path::PathBuf;

use thiserror::Error;

use krknai_aggregator::AggregatorError;
use krknai_llm::LlmError;
use krknai_prompts::PromptError;

use crate::stage::Stage;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("collecting results: {0}")]
    Collect(#[from] AggregatorError),

    #[error("rendering prompt: {0}")]
    Render(#[from] PromptError),

    #[error("model invocation: {0}")]
    Llm(#[from] LlmError),

    #[error("writing summary {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing summary: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("analysis cancelled while {stage}")]
    Cancelled { stage: Stage },
}

pub type Result<T> = std::result::Result<T, EngineError>;
