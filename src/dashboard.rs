//! Dashboard
//!
//! Session state for an interactive front end and the panel data it shows.
//! The session is an explicit value handed in per interaction; nothing here
//! keeps process-wide state.

use crate::aggregate::{AggregationEngine, AggregationSettings};
use crate::error::Result;
use crate::filter::{search_titles, FilterSelection};
use crate::table::CatalogTable;
use crate::view::{keys, CategoryCount, MonthCount, SeriesPoint};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Row counts offered by the explore table.
pub const ROW_CHOICES: [usize; 4] = [10, 25, 50, 100];
pub const DEFAULT_ROWS: usize = 25;

/// Per-user dashboard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSession {
    pub filter: FilterSelection,
    pub search: String,
    pub rows_to_show: usize,
}

impl DashboardSession {
    /// A fresh session with every filter option selected.
    pub fn new(table: &CatalogTable) -> Self {
        Self {
            filter: FilterSelection::full(table.defaults()),
            search: String::new(),
            rows_to_show: DEFAULT_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_titles: usize,
    pub movies: Option<usize>,
    pub tv_shows: Option<usize>,
    pub countries: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewPanel {
    pub type_distribution: Option<Vec<CategoryCount>>,
    pub top_ratings: Option<Vec<CategoryCount>>,
    pub movie_durations: Option<Vec<u32>>,
    pub mean_duration_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenrePanel {
    pub top_genres: Option<Vec<CategoryCount>>,
    pub trends: Option<Vec<SeriesPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographicPanel {
    pub top_countries: Option<Vec<CategoryCount>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPanel {
    pub per_year_by_type: Option<Vec<SeriesPoint>>,
    pub monthly: Option<Vec<MonthCount>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorePanel {
    pub search: String,
    pub matches: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Everything one dashboard render needs, for one session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub metrics: Metrics,
    pub overview: OverviewPanel,
    pub genres: GenrePanel,
    pub geographic: GeographicPanel,
    pub temporal: TemporalPanel,
    pub explore: ExplorePanel,
}

impl DashboardSnapshot {
    pub fn build(
        table: &CatalogTable,
        session: &DashboardSession,
        settings: &AggregationSettings,
    ) -> Result<Self> {
        let filtered = session.filter.apply(table)?;
        let view = AggregationEngine::new().compute_filtered(&filtered, settings);

        let counts = |key: &str| view.counts(key).map(<[CategoryCount]>::to_vec);
        let series = |key: &str| view.series(key).map(<[SeriesPoint]>::to_vec);

        let metrics = Metrics {
            total_titles: view.count(keys::TOTAL_COUNT).unwrap_or(0),
            movies: view.count(keys::MOVIE_COUNT),
            tv_shows: view.count(keys::TV_SHOW_COUNT),
            countries: view.count(keys::COUNTRY_COUNT),
        };

        let overview = OverviewPanel {
            type_distribution: counts(keys::COUNT_BY_TYPE),
            top_ratings: counts(keys::TOP_RATINGS),
            movie_durations: view.values(keys::DURATION_MINUTES).map(<[u32]>::to_vec),
            mean_duration_minutes: view.number(keys::MEAN_DURATION_MINUTES),
        };

        let genres = GenrePanel {
            top_genres: counts(keys::TOP_GENRES),
            trends: series(keys::GENRE_TRENDS),
        };

        let geographic = GeographicPanel {
            top_countries: counts(keys::TOP_COUNTRIES),
        };

        let temporal = TemporalPanel {
            per_year_by_type: series(keys::PER_YEAR_BY_TYPE),
            monthly: view.months(keys::MONTHLY_DISTRIBUTION).map(<[MonthCount]>::to_vec),
        };

        let hits = search_titles(&filtered, &session.search)?;
        let (columns, rows) = preview_rows(&hits, session.rows_to_show)?;
        let explore = ExplorePanel {
            search: session.search.clone(),
            matches: hits.height(),
            columns,
            rows,
        };

        Ok(Self {
            metrics,
            overview,
            genres,
            geographic,
            temporal,
            explore,
        })
    }
}

/// First `limit` rows as text cells, with the column labels.
fn preview_rows(table: &CatalogTable, limit: usize) -> Result<(Vec<String>, Vec<Vec<Option<String>>>)> {
    let head = table.frame().head(Some(limit));
    let columns: Vec<String> = head.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut rows: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(columns.len()); head.height()];

    for series in head.get_columns() {
        let text = series.cast(&DataType::String)?;
        for (row, cell) in text.str()?.into_iter().enumerate() {
            rows[row].push(cell.map(String::from));
        }
    }

    Ok((columns, rows))
}

/// File name for a filtered download made on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("catalog_filtered_{}.csv", date.format("%Y%m%d"))
}

/// Write the (filtered) table as CSV.
pub fn export_csv(table: &CatalogTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut frame = table.frame().clone();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;

    info!("Exported {} rows to {}", frame.height(), path.display());
    Ok(())
}
