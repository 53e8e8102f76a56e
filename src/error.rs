//! Error type shared by the loading and inference code.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("cannot read artifact {path:?}: {source}")]
    ArtifactIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode artifact {path:?}: {source}")]
    ArtifactDecode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cannot encode predictions: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("inference task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_artifact_message() {
        let error = ServiceError::InvalidArtifact("tree 3 is empty".to_string());
        assert_eq!(error.to_string(), "invalid artifact: tree 3 is empty");
    }

    #[test]
    fn polars_errors_convert() {
        fn lookup() -> Result<()> {
            Err(PolarsError::ColumnNotFound("Age".into()))?;
            Ok(())
        }
        assert!(matches!(lookup(), Err(ServiceError::Polars(_))));
    }
}
