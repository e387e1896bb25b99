use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("results directory not found: {0}")]
    MissingResultsDir(PathBuf),

    #[error("scenario results not found at {0}")]
    MissingResults(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("collection task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
