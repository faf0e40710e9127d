//! Application configuration
//!
//! Precedence, lowest first: defaults, JSON config file, environment
//! (including `.env`), command-line overrides applied by the binary.

use crate::aggregate::AggregationSettings;
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_DATA_PATHS: &str = "CATALOG_DATA_PATHS";
pub const ENV_OUT_DIR: &str = "CATALOG_OUT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Candidate dataset paths; the first existing one is loaded.
    pub data_paths: Vec<PathBuf>,
    pub out_dir: PathBuf,
    /// Explicit chart directory; `<out_dir>/charts` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_dir: Option<PathBuf>,
    pub deck_title: String,
    pub aggregation: AggregationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        let out_dir = PathBuf::from("outputs");
        Self {
            data_paths: vec![
                out_dir.join("cleaned_netflix.csv"),
                PathBuf::from("Netflix Dataset.csv"),
            ],
            out_dir,
            chart_dir: None,
            deck_title: "Catalog Dataset Analysis".to_string(),
            aggregation: AggregationSettings::default(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Defaults, or the given file, with environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `CATALOG_DATA_PATHS` (an OS path list) and `CATALOG_OUT_DIR`.
    pub fn apply_env(&mut self) {
        if let Some(paths) = env::var_os(ENV_DATA_PATHS) {
            let paths: Vec<PathBuf> = env::split_paths(&paths).collect();
            if !paths.is_empty() {
                debug!("Data paths from {}: {:?}", ENV_DATA_PATHS, paths);
                self.data_paths = paths;
            }
        }
        if let Ok(out_dir) = env::var(ENV_OUT_DIR) {
            self.set_out_dir(PathBuf::from(out_dir));
        }
    }

    /// Move the output directory. A derived chart directory follows it.
    pub fn set_out_dir(&mut self, out_dir: PathBuf) {
        self.out_dir = out_dir;
    }

    pub fn chart_dir(&self) -> PathBuf {
        self.chart_dir
            .clone()
            .unwrap_or_else(|| self.out_dir.join("charts"))
    }
}
