//! Catalog Table
//!
//! The normalized, read-only in-memory table plus the metadata computed once
//! at load time (column capabilities and the default filter selection).

use crate::filter::FilterDefaults;
use crate::schema::{SchemaCapabilities, SchemaKind, DATE_ADDED, YEAR_ADDED};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Normalized catalog table
#[derive(Debug, Clone)]
pub struct CatalogTable {
    frame: DataFrame,
    kind: SchemaKind,
    capabilities: Arc<SchemaCapabilities>,
    defaults: Arc<FilterDefaults>,
    source: Option<PathBuf>,
}

impl CatalogTable {
    /// Wrap a normalized frame, computing capabilities and filter defaults.
    pub fn new(frame: DataFrame, kind: SchemaKind, source: Option<PathBuf>) -> Self {
        let capabilities = SchemaCapabilities::from_columns(
            frame.get_column_names().iter().map(|s| s.to_string()),
        );
        let mut table = Self {
            frame,
            kind,
            capabilities: Arc::new(capabilities),
            defaults: Arc::new(FilterDefaults::default()),
            source,
        };
        table.defaults = Arc::new(FilterDefaults::from_table(&table));
        table
    }

    /// A subset of this table's rows. Capabilities and defaults are shared, not recomputed.
    pub(crate) fn with_frame(&self, frame: DataFrame) -> Self {
        Self {
            frame,
            kind: self.kind,
            capabilities: Arc::clone(&self.capabilities),
            defaults: Arc::clone(&self.defaults),
            source: self.source.clone(),
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn defaults(&self) -> &FilterDefaults {
        &self.defaults
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has(&self, column: &str) -> bool {
        self.capabilities.has(column)
    }

    /// Text column, or `None` when the column is absent.
    pub fn text(&self, column: &str) -> Option<&StringChunked> {
        if !self.has(column) {
            return None;
        }
        self.frame.column(column).ok()?.str().ok()
    }

    pub fn years(&self) -> Option<&Int32Chunked> {
        if !self.has(YEAR_ADDED) {
            return None;
        }
        self.frame.column(YEAR_ADDED).ok()?.i32().ok()
    }

    pub fn dates(&self) -> Option<&DateChunked> {
        if !self.has(DATE_ADDED) {
            return None;
        }
        self.frame.column(DATE_ADDED).ok()?.date().ok()
    }
}
