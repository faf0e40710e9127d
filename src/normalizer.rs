//! Dataset Normalizer
//!
//! Loads a catalog CSV and maps either known input shape onto the canonical
//! column layout:
//! - header labels trimmed, lowercased, spaces replaced with underscores
//! - `category` / `type` / `listed_in` reconciled according to the detected `SchemaKind`
//! - `release_date` promoted to `date_added`
//! - `date_added` parsed to a date column, `year_added` derived from it
//!
//! Only a missing source file is fatal. Unparseable cells become nulls.

use crate::error::{CatalogError, Result};
use crate::schema::{
    normalize_label, SchemaKind, CATEGORY, DATE_ADDED, LISTED_IN, RELEASE_DATE, TYPE, YEAR_ADDED,
};
use crate::table::CatalogTable;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y", "%d-%b-%y", "%d %B %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a `date_added` cell. Returns `None` for anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Coerce a stored year cell (`"2019"`, `"2019.0"`) to an integer year.
fn parse_year(raw: &str) -> Option<i32> {
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value.trunc() as i32)
}

fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Dataset normalizer
#[derive(Debug, Default, Clone)]
pub struct DatasetNormalizer;

impl DatasetNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// First existing path among the candidates, in order.
    pub fn resolve_source<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf> {
        candidates
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.exists())
            .map(Path::to_path_buf)
            .ok_or_else(|| CatalogError::DatasetNotFound {
                checked: candidates.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            })
    }

    /// Load the first existing candidate.
    pub fn load_first<P: AsRef<Path>>(&self, candidates: &[P]) -> Result<CatalogTable> {
        let path = Self::resolve_source(candidates)?;
        self.load(&path)
    }

    /// Load and normalize a single CSV file.
    pub fn load(&self, path: &Path) -> Result<CatalogTable> {
        if !path.exists() {
            return Err(CatalogError::DatasetNotFound {
                checked: vec![path.to_path_buf()],
            });
        }

        // Every column is read as text; coercion happens in `normalize`.
        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| {
                CatalogError::Normalization(format!("Failed to load CSV {}: {}", path.display(), e))
            })?;

        info!(
            "Loaded {} rows ({} columns) from {}",
            frame.height(),
            frame.width(),
            path.display()
        );

        self.normalize(frame, Some(path.to_path_buf()))
    }

    /// Normalize an already loaded frame.
    pub fn normalize(&self, frame: DataFrame, source: Option<PathBuf>) -> Result<CatalogTable> {
        let mut frame = frame;

        // Step 1: canonical header labels
        self.normalize_labels(&mut frame)?;

        // Step 2: every source column is text until explicitly coerced
        self.coerce_to_text(&mut frame)?;

        // Step 3: resolve the input shape once, then reconcile
        let names: Vec<String> = frame.get_column_names().iter().map(|s| s.to_string()).collect();
        let kind = SchemaKind::detect(&names);
        debug!("Detected schema kind {:?}", kind);
        self.reconcile(&mut frame, kind)?;

        // Step 4: calendar fields
        self.derive_dates(&mut frame)?;

        Ok(CatalogTable::new(frame, kind, source))
    }

    fn normalize_labels(&self, frame: &mut DataFrame) -> Result<()> {
        let current: Vec<String> = frame.get_column_names().iter().map(|s| s.to_string()).collect();
        let normalized: Vec<String> = current.iter().map(|c| normalize_label(c)).collect();

        if current == normalized {
            return Ok(());
        }

        // Labels that collide after normalization keep the leftmost column.
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(normalized.len());
        for (series, label) in frame.get_columns().iter().zip(&normalized) {
            if seen.insert(label.as_str()) {
                let mut series = series.clone();
                series.rename(label);
                kept.push(series);
            } else {
                warn!("Dropping column '{}': its label duplicates '{}'", series.name(), label);
            }
        }

        *frame = DataFrame::new(kept)
            .map_err(|e| CatalogError::Normalization(format!("Failed to normalize column labels: {}", e)))?;
        Ok(())
    }

    fn coerce_to_text(&self, frame: &mut DataFrame) -> Result<()> {
        let non_text: Vec<Series> = frame
            .get_columns()
            .iter()
            .filter(|s| !matches!(s.dtype(), DataType::String))
            .cloned()
            .collect();

        for series in non_text {
            let text = series.cast(&DataType::String)?;
            frame.with_column(text)?;
        }
        Ok(())
    }

    fn reconcile(&self, frame: &mut DataFrame, kind: SchemaKind) -> Result<()> {
        match kind {
            SchemaKind::RawCategory => {
                if has_column(frame, TYPE) {
                    if has_column(frame, LISTED_IN) {
                        // `category` wins; the old `type` column is discarded.
                        let _genres = frame.drop_in_place(TYPE)?;
                    } else {
                        rename(frame, TYPE, LISTED_IN)?;
                    }
                }
                rename(frame, CATEGORY, TYPE)?;
            }
            SchemaKind::GenreTyped => {
                rename(frame, TYPE, LISTED_IN)?;
            }
            SchemaKind::Canonical => {}
        }

        if !has_column(frame, LISTED_IN) {
            let empty = Series::new(LISTED_IN, vec![""; frame.height()]);
            frame.with_column(empty)?;
        }

        if has_column(frame, RELEASE_DATE) && !has_column(frame, DATE_ADDED) {
            rename(frame, RELEASE_DATE, DATE_ADDED)?;
        }

        Ok(())
    }

    fn derive_dates(&self, frame: &mut DataFrame) -> Result<()> {
        if has_column(frame, DATE_ADDED) {
            let parsed: Vec<Option<NaiveDate>> = frame
                .column(DATE_ADDED)?
                .str()?
                .into_iter()
                .map(|cell| cell.and_then(parse_date))
                .collect();

            let failures = parsed.iter().filter(|d| d.is_none()).count();
            if failures > 0 {
                debug!("{} rows have no parseable {}", failures, DATE_ADDED);
            }

            let years: Vec<Option<i32>> = parsed.iter().map(|d| d.map(|d| d.year())).collect();
            let days: Vec<Option<i32>> = parsed.into_iter().map(|d| d.map(to_epoch_days)).collect();

            let dates = Series::new(DATE_ADDED, days).cast(&DataType::Date)?;
            frame.with_column(dates)?;
            frame.with_column(Series::new(YEAR_ADDED, years))?;
        } else if has_column(frame, YEAR_ADDED) {
            let years: Vec<Option<i32>> = frame
                .column(YEAR_ADDED)?
                .str()?
                .into_iter()
                .map(|cell| cell.and_then(parse_year))
                .collect();
            frame.with_column(Series::new(YEAR_ADDED, years))?;
        }

        Ok(())
    }
}

fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.column(name).is_ok()
}

fn rename(frame: &mut DataFrame, from: &str, to: &str) -> Result<()> {
    frame.rename(from, to).map_err(|e| {
        CatalogError::Normalization(format!("Failed to rename column {} to {}: {}", from, to, e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RATING, TITLE};

    fn column_names(table: &CatalogTable) -> Vec<String> {
        table.frame().get_column_names().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 9, 25);
        assert_eq!(parse_date("September 25, 2021"), expected);
        assert_eq!(parse_date(" September 25, 2021 "), expected);
        assert_eq!(parse_date("Sep 25, 2021"), expected);
        assert_eq!(parse_date("2021-09-25"), expected);
        assert_eq!(parse_date("2021-09-25 00:00:00"), expected);
        assert_eq!(parse_date("09/25/2021"), expected);
        assert_eq!(parse_date("25-Sep-21"), expected);
        assert_eq!(parse_date("August 4, 2017"), NaiveDate::from_ymd_opt(2017, 8, 4));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_year_drops_float_artifacts() {
        assert_eq!(parse_year("2019.0"), Some(2019));
        assert_eq!(parse_year("2020"), Some(2020));
        assert_eq!(parse_year("nan"), None);
        assert_eq!(parse_year("soon"), None);
    }

    #[test]
    fn test_parse_year_rejects_out_of_range() {
        assert_eq!(parse_year("1e12"), None);
        assert_eq!(parse_year("-1e12"), None);
        assert_eq!(parse_year("1999.9"), Some(1999));
    }

    #[test]
    fn test_epoch_days() {
        assert_eq!(to_epoch_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(to_epoch_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
    }

    #[test]
    fn test_raw_schema_is_reconciled() {
        let df = df![
            "Show_Id" => ["s1", "s2"],
            "Category" => ["Movie", "TV Show"],
            "Title" => ["A", "B"],
            "Type" => ["Dramas, Thrillers", "Kids' TV"],
            "Release_Date" => ["August 14, 2020", "bad"],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        assert_eq!(table.kind(), SchemaKind::RawCategory);

        let names = column_names(&table);
        assert!(names.contains(&"type".to_string()));
        assert!(names.contains(&"listed_in".to_string()));
        assert!(names.contains(&"date_added".to_string()));
        assert!(!names.contains(&"category".to_string()));
        assert!(!names.contains(&"release_date".to_string()));

        let types: Vec<Option<&str>> = table.text(TYPE).unwrap().into_iter().collect();
        assert_eq!(types, vec![Some("Movie"), Some("TV Show")]);
        let genres: Vec<Option<&str>> = table.text(LISTED_IN).unwrap().into_iter().collect();
        assert_eq!(genres, vec![Some("Dramas, Thrillers"), Some("Kids' TV")]);

        let years: Vec<Option<i32>> = table.years().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2020), None]);
    }

    #[test]
    fn test_category_wins_when_listed_in_exists() {
        let df = df![
            "category" => ["Movie"],
            "type" => ["Dramas"],
            "listed_in" => ["Comedies"],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        let types: Vec<Option<&str>> = table.text(TYPE).unwrap().into_iter().collect();
        assert_eq!(types, vec![Some("Movie")]);
        let genres: Vec<Option<&str>> = table.text(LISTED_IN).unwrap().into_iter().collect();
        assert_eq!(genres, vec![Some("Comedies")]);
    }

    #[test]
    fn test_genre_typed_schema_moves_type_to_listed_in() {
        let df = df![
            "title" => ["A"],
            "type" => ["Dramas, Comedies"],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        assert_eq!(table.kind(), SchemaKind::GenreTyped);
        assert!(!table.has(TYPE));
        assert!(table.has(LISTED_IN));
    }

    #[test]
    fn test_missing_listed_in_defaults_to_empty_text() {
        let df = df![
            "title" => ["A", "B"],
            "rating" => ["PG", "R"],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        let genres: Vec<Option<&str>> = table.text(LISTED_IN).unwrap().into_iter().collect();
        assert_eq!(genres, vec![Some(""), Some("")]);
        assert!(table.has(TITLE));
        assert!(table.has(RATING));
        assert!(!table.has(YEAR_ADDED));
    }

    #[test]
    fn test_existing_year_added_is_integer() {
        let df = df![
            "title" => ["A", "B", "C"],
            "year_added" => [Some("2019.0"), None, Some("2021")],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        let years: Vec<Option<i32>> = table.years().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2019), None, Some(2021)]);
    }

    #[test]
    fn test_non_text_columns_are_coerced() {
        let df = df![
            "title" => ["A"],
            "release_year" => [2020i64],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        let years: Vec<Option<&str>> = table.text("release_year").unwrap().into_iter().collect();
        assert_eq!(years, vec![Some("2020")]);
    }

    #[test]
    fn test_colliding_labels_keep_first_column() {
        let df = df![
            "Title" => ["A"],
            "Type" => ["Movie"],
            "type" => ["Dramas"],
            "listed_in" => ["Dramas"],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        assert_eq!(column_names(&table), vec!["title", "type", "listed_in"]);
        let types: Vec<Option<&str>> = table.text(TYPE).unwrap().into_iter().collect();
        assert_eq!(types, vec![Some("Movie")]);
    }

    #[test]
    fn test_colliding_date_labels_do_not_fail_load() {
        let df = df![
            "title" => ["A"],
            "Release Date" => ["August 14, 2020"],
            "release_date" => ["not a date"],
        ]
        .unwrap();

        let table = DatasetNormalizer::new().normalize(df, None).unwrap();
        assert!(table.has(DATE_ADDED));
        assert!(!table.has(RELEASE_DATE));
        let years: Vec<Option<i32>> = table.years().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2020)]);
    }

    #[test]
    fn test_resolve_source_reports_all_candidates() {
        let candidates = ["/definitely/missing/a.csv", "/definitely/missing/b.csv"];
        match DatasetNormalizer::resolve_source(&candidates) {
            Err(CatalogError::DatasetNotFound { checked }) => assert_eq!(checked.len(), 2),
            other => panic!("expected DatasetNotFound, got {:?}", other),
        }
    }
}
