use std::path::PathBuf;

use thiserror::Error;

use crate::run_config::ValidationError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("reading discovered yaml {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unmarshaling yaml {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("marshaling updated yaml: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("writing updated yaml {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
