//! Dataset Cache
//!
//! Keeps normalized tables in memory, keyed by the resolved source path.
//! Entries live for the lifetime of the cache; there is no invalidation.

use crate::error::Result;
use crate::normalizer::DatasetNormalizer;
use crate::table::CatalogTable;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Dataset cache manager
#[derive(Debug, Default)]
pub struct DatasetCache {
    normalizer: DatasetNormalizer,
    entries: HashMap<PathBuf, Arc<CatalogTable>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the first existing candidate and load it, reusing a cached table.
    pub fn get_or_load<P: AsRef<Path>>(&mut self, candidates: &[P]) -> Result<Arc<CatalogTable>> {
        let path = DatasetNormalizer::resolve_source(candidates)?;

        if let Some(table) = self.entries.get(&path) {
            debug!("Dataset cache hit for {}", path.display());
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(self.normalizer.load(&path)?);
        self.entries.insert(path, Arc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
