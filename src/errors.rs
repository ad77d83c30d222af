use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Gazetteer or reference data could not be loaded. Fatal for the whole
    /// resolution run; there is no partial or degraded mode.
    #[error("failed to load reference data: {0}")]
    DataLoad(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Config(String),
}
