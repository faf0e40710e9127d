//! Chart Specs and Rendering
//!
//! Turns an aggregate view into chart specifications and hands them to a
//! `ChartRenderer`. A failed export is logged and recorded as an omission;
//! the rest of the batch still renders.

use crate::error::{CatalogError, Result};
use crate::view::{keys, AggregateView, CategoryCount, SeriesPoint};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bars shown in ranked charts.
pub const CHART_TOP_N: usize = 15;
pub const HISTOGRAM_BINS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Area,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ChartData {
    Categories { points: Vec<CategoryCount> },
    Series { points: Vec<SeriesPoint> },
    Samples { values: Vec<u32>, bins: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub key: String,
    pub file_stem: String,
    pub title: String,
    /// Heading used when the chart is placed on a slide.
    pub slide_title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

/// Chart specs for every aggregate present and non-empty in the view.
pub fn chart_specs(view: &AggregateView) -> Vec<ChartSpec> {
    let mut specs = Vec::new();

    if let Some(types) = view.counts(keys::COUNT_BY_TYPE).filter(|c| !c.is_empty()) {
        specs.push(ChartSpec {
            key: "type_dist".to_string(),
            file_stem: "type_distribution".to_string(),
            title: "Distribution: Movies vs TV Shows".to_string(),
            slide_title: "Movies vs TV Shows".to_string(),
            kind: ChartKind::Bar,
            x_label: "Type".to_string(),
            y_label: "Count".to_string(),
            data: ChartData::Categories { points: types.to_vec() },
        });
    }

    if let Some(per_year) = view.series(keys::PER_YEAR_BY_TYPE).filter(|s| !s.is_empty()) {
        specs.push(ChartSpec {
            key: "per_year".to_string(),
            file_stem: "content_per_year".to_string(),
            title: "Content Added Per Year by Type".to_string(),
            slide_title: "Content Added Per Year by Type".to_string(),
            kind: ChartKind::Area,
            x_label: "Year".to_string(),
            y_label: "Number of Titles".to_string(),
            data: ChartData::Series { points: per_year.to_vec() },
        });
    }

    if let Some(genres) = view.counts(keys::TOP_GENRES).filter(|c| !c.is_empty()) {
        let points = top(genres);
        specs.push(ChartSpec {
            key: "top_genres".to_string(),
            file_stem: "top_genres".to_string(),
            title: format!("Top {} Genres", points.len()),
            slide_title: "Top Genres".to_string(),
            kind: ChartKind::HorizontalBar,
            x_label: "Count".to_string(),
            y_label: "Genre".to_string(),
            data: ChartData::Categories { points },
        });
    }

    if let Some(countries) = view.counts(keys::TOP_COUNTRIES).filter(|c| !c.is_empty()) {
        let points = top(countries);
        specs.push(ChartSpec {
            key: "top_countries".to_string(),
            file_stem: "top_countries".to_string(),
            title: format!("Top {} Countries by Titles", points.len()),
            slide_title: "Top Countries by Titles".to_string(),
            kind: ChartKind::HorizontalBar,
            x_label: "Count".to_string(),
            y_label: "Country".to_string(),
            data: ChartData::Categories { points },
        });
    }

    if let Some(minutes) = view.values(keys::DURATION_MINUTES).filter(|v| !v.is_empty()) {
        specs.push(ChartSpec {
            key: "duration".to_string(),
            file_stem: "movie_duration".to_string(),
            title: "Distribution of Movie Durations (min)".to_string(),
            slide_title: "Distribution of Movie Durations".to_string(),
            kind: ChartKind::Histogram,
            x_label: "Minutes".to_string(),
            y_label: "Count".to_string(),
            data: ChartData::Samples {
                values: minutes.to_vec(),
                bins: HISTOGRAM_BINS,
            },
        });
    }

    specs
}

fn top(counts: &[CategoryCount]) -> Vec<CategoryCount> {
    counts.iter().take(CHART_TOP_N).cloned().collect()
}

/// Turns a chart spec into a file. Pixel rendering lives behind this seam.
pub trait ChartRenderer {
    fn render(&self, spec: &ChartSpec, dir: &Path) -> Result<PathBuf>;
}

/// Writes each spec as a JSON document for an external plotting front end.
#[derive(Debug, Default, Clone)]
pub struct JsonChartRenderer;

impl ChartRenderer for JsonChartRenderer {
    fn render(&self, spec: &ChartSpec, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| {
            CatalogError::RenderExport(format!("Failed to create chart directory {}: {}", dir.display(), e))
        })?;

        let path = dir.join(format!("{}.json", spec.file_stem));
        let body = serde_json::to_string_pretty(spec)?;
        fs::write(&path, body).map_err(|e| {
            CatalogError::RenderExport(format!("Failed to write chart {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedChart {
    pub key: String,
    pub slide_title: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOmission {
    pub key: String,
    pub reason: String,
}

/// Outcome of rendering a batch of specs, in spec order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderBatch {
    pub rendered: Vec<RenderedChart>,
    pub omitted: Vec<RenderOmission>,
}

impl RenderBatch {
    pub fn get(&self, key: &str) -> Option<&RenderedChart> {
        self.rendered.iter().find(|c| c.key == key)
    }
}

/// Render every spec, continuing past failures.
pub fn render_all(renderer: &dyn ChartRenderer, specs: &[ChartSpec], dir: &Path) -> RenderBatch {
    let mut batch = RenderBatch::default();

    for spec in specs {
        match renderer.render(spec, dir) {
            Ok(path) => {
                info!("Rendered chart {} to {}", spec.key, path.display());
                batch.rendered.push(RenderedChart {
                    key: spec.key.clone(),
                    slide_title: spec.slide_title.clone(),
                    path,
                });
            }
            Err(e) => {
                warn!("Could not export chart '{}': {}", spec.key, e);
                batch.omitted.push(RenderOmission {
                    key: spec.key.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    batch
}
