use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Dataset not found. Checked {checked:?}")]
    DatasetNotFound { checked: Vec<PathBuf> },

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Render export error: {0}")]
    RenderExport(String),

    #[error("Presentation error: {0}")]
    Presentation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for CatalogError {
    fn from(err: polars::error::PolarsError) -> Self {
        CatalogError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
