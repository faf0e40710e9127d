//! Aggregation Engine
//!
//! Counting, ranking and grouping over a (filtered) catalog table. Every
//! operation is a pure function of its inputs: absent columns produce empty
//! results or the `N/A` sentinel, never an error.

use crate::error::Result;
use crate::filter::FilterSelection;
use crate::multivalue::explode;
use crate::schema::{
    CAST, COUNTRY, DATE_ADDED, DIRECTOR, DURATION, LISTED_IN, MOVIE, RATING, TV_SHOW, TYPE,
    YEAR_ADDED,
};
use crate::table::CatalogTable;
use crate::view::{keys, AggregateValue, AggregateView, CategoryCount, MonthCount, SeriesPoint};
use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Sentinel returned by `mode` when there is nothing to count.
pub const NOT_AVAILABLE: &str = "N/A";

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

lazy_static! {
    static ref LEADING_DIGITS: Regex = Regex::new(r"^\s*(\d+)").unwrap();
}

/// Top-N sizes and axis options used by `compute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    pub top_genres: usize,
    pub top_countries: usize,
    pub top_ratings: usize,
    pub top_people: usize,
    pub trend_genres: usize,
    /// Report all twelve months, zero-filled, instead of only observed ones.
    pub complete_month_axis: bool,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            top_genres: 15,
            top_countries: 20,
            top_ratings: 10,
            top_people: 10,
            trend_genres: 5,
            complete_month_axis: false,
        }
    }
}

/// Parse the leading integer run of a duration cell (`"90 min"` -> 90).
pub fn duration_minutes(raw: &str) -> Option<u32> {
    LEADING_DIGITS
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Count occurrences and rank by descending count.
///
/// Ties keep first-encountered order (stable sort).
fn rank<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<CategoryCount> = Vec::new();

    for value in values {
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(CategoryCount::new(value, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn take(mut counts: Vec<CategoryCount>, limit: Option<usize>) -> Vec<CategoryCount> {
    if let Some(n) = limit {
        counts.truncate(n);
    }
    counts
}

/// Aggregation engine
#[derive(Debug, Default, Clone)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn total_count(&self, table: &CatalogTable) -> usize {
        table.height()
    }

    /// Category -> count over `type`, nulls dropped.
    pub fn count_by_type(&self, table: &CatalogTable) -> Vec<CategoryCount> {
        self.value_counts(table, TYPE, None)
    }

    /// Ranked counts of a single-valued column.
    pub fn value_counts(
        &self,
        table: &CatalogTable,
        column: &str,
        limit: Option<usize>,
    ) -> Vec<CategoryCount> {
        match table.text(column) {
            Some(values) => take(rank(values.into_iter().flatten()), limit),
            None => Vec::new(),
        }
    }

    /// Ranked counts of an exploded multi-valued column, top `n`.
    pub fn top_n_multivalue(&self, table: &CatalogTable, column: &str, n: usize) -> Vec<CategoryCount> {
        match table.text(column) {
            Some(values) => take(rank(values.into_iter().flatten().flat_map(explode)), Some(n)),
            None => Vec::new(),
        }
    }

    /// Rows whose `column` equals `value` exactly.
    pub fn count_equal(&self, table: &CatalogTable, column: &str, value: &str) -> usize {
        table
            .text(column)
            .map(|values| values.into_iter().filter(|v| *v == Some(value)).count())
            .unwrap_or(0)
    }

    /// Distinct exploded values of a multi-valued column.
    pub fn unique_multivalue_count(&self, table: &CatalogTable, column: &str) -> usize {
        table
            .text(column)
            .map(|values| {
                values
                    .into_iter()
                    .flatten()
                    .flat_map(explode)
                    .collect::<HashSet<_>>()
                    .len()
            })
            .unwrap_or(0)
    }

    /// Rows per (`year_added`, `group_column`), sorted by year then group.
    /// Rows with a null year or null group are excluded.
    pub fn grouped_time_series(&self, table: &CatalogTable, group_column: &str) -> Vec<SeriesPoint> {
        let (Some(years), Some(groups)) = (table.years(), table.text(group_column)) else {
            return Vec::new();
        };

        let mut buckets: BTreeMap<(i32, &str), usize> = BTreeMap::new();
        for (year, group) in years.into_iter().zip(groups.into_iter()) {
            if let (Some(year), Some(group)) = (year, group) {
                *buckets.entry((year, group)).or_insert(0) += 1;
            }
        }

        into_series(buckets)
    }

    /// Per-year counts of the `top_k` most frequent exploded values of `column`.
    ///
    /// The top values are ranked over rows that have both a year and a value.
    pub fn multivalue_time_series(
        &self,
        table: &CatalogTable,
        column: &str,
        top_k: usize,
    ) -> Vec<SeriesPoint> {
        let (Some(years), Some(values)) = (table.years(), table.text(column)) else {
            return Vec::new();
        };

        let pairs: Vec<(i32, &str)> = years
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(year, cell)| Some((year?, cell?)))
            .flat_map(|(year, cell)| explode(cell).map(move |v| (year, v)))
            .collect();

        let top: HashSet<String> = take(rank(pairs.iter().map(|(_, v)| *v)), Some(top_k))
            .into_iter()
            .map(|c| c.label)
            .collect();

        let mut buckets: BTreeMap<(i32, &str), usize> = BTreeMap::new();
        for (year, value) in pairs {
            if top.contains(value) {
                *buckets.entry((year, value)).or_insert(0) += 1;
            }
        }

        into_series(buckets)
    }

    /// Rows per month name of `date_added`, January through December.
    ///
    /// Months without rows are omitted unless `complete_axis` is set, in which
    /// case they are reported as zero.
    pub fn monthly_distribution(&self, table: &CatalogTable, complete_axis: bool) -> Vec<MonthCount> {
        let Some(dates) = table.dates() else {
            return Vec::new();
        };

        let mut counts = [0usize; 12];
        for date in dates.as_date_iter().flatten() {
            counts[date.month0() as usize] += 1;
        }

        MONTH_NAMES
            .iter()
            .zip(counts)
            .filter(|(_, count)| complete_axis || *count > 0)
            .map(|(month, count)| MonthCount {
                month: month.to_string(),
                count,
            })
            .collect()
    }

    /// Minutes of every movie row whose duration has a leading integer.
    pub fn duration_minutes_distribution(&self, table: &CatalogTable) -> Vec<u32> {
        let (Some(types), Some(durations)) = (table.text(TYPE), table.text(DURATION)) else {
            return Vec::new();
        };

        types
            .into_iter()
            .zip(durations.into_iter())
            .filter(|(kind, _)| *kind == Some(MOVIE))
            .filter_map(|(_, duration)| duration.and_then(duration_minutes))
            .collect()
    }

    /// Mean movie duration; `None` when no movie has a parseable duration.
    pub fn mean_duration_minutes(&self, table: &CatalogTable) -> Option<f64> {
        let minutes = self.duration_minutes_distribution(table);
        if minutes.is_empty() {
            return None;
        }
        let total: u64 = minutes.iter().map(|m| u64::from(*m)).sum();
        Some(total as f64 / minutes.len() as f64)
    }

    /// Most frequent value of `column` (exploded first when `multivalued`).
    ///
    /// Ties resolve to the lexicographically smallest value. Absent or
    /// all-null columns yield `N/A`.
    pub fn mode(&self, table: &CatalogTable, column: &str, multivalued: bool) -> String {
        let Some(values) = table.text(column) else {
            return NOT_AVAILABLE.to_string();
        };

        let counts = if multivalued {
            rank(values.into_iter().flatten().flat_map(explode))
        } else {
            rank(values.into_iter().flatten())
        };

        counts
            .into_iter()
            .max_by(|a, b| a.count.cmp(&b.count).then_with(|| b.label.cmp(&a.label)))
            .map(|c| c.label)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// Evaluate every named aggregate for a (table, filter) pair.
    ///
    /// Entries whose source columns are absent are omitted from the view.
    pub fn compute(
        &self,
        table: &CatalogTable,
        filter: &FilterSelection,
        settings: &AggregationSettings,
    ) -> Result<AggregateView> {
        let filtered = filter.apply(table)?;
        Ok(self.compute_filtered(&filtered, settings))
    }

    /// Evaluate every named aggregate over a table that is already filtered.
    pub fn compute_filtered(&self, t: &CatalogTable, settings: &AggregationSettings) -> AggregateView {
        let mut view = AggregateView::new();

        view.insert(keys::TOTAL_COUNT, AggregateValue::Count(self.total_count(t)));

        if t.has(TYPE) {
            view.insert(keys::COUNT_BY_TYPE, AggregateValue::Counts(self.count_by_type(t)));
            view.insert(keys::MOVIE_COUNT, AggregateValue::Count(self.count_equal(t, TYPE, MOVIE)));
            view.insert(
                keys::TV_SHOW_COUNT,
                AggregateValue::Count(self.count_equal(t, TYPE, TV_SHOW)),
            );
        }

        if t.has(RATING) {
            view.insert(
                keys::TOP_RATINGS,
                AggregateValue::Counts(self.value_counts(t, RATING, Some(settings.top_ratings))),
            );
        }

        if t.has(LISTED_IN) {
            view.insert(
                keys::TOP_GENRES,
                AggregateValue::Counts(self.top_n_multivalue(t, LISTED_IN, settings.top_genres)),
            );
        }

        if t.has(COUNTRY) {
            view.insert(
                keys::TOP_COUNTRIES,
                AggregateValue::Counts(self.top_n_multivalue(t, COUNTRY, settings.top_countries)),
            );
            view.insert(
                keys::COUNTRY_COUNT,
                AggregateValue::Count(self.unique_multivalue_count(t, COUNTRY)),
            );
        }

        if t.has(DIRECTOR) {
            view.insert(
                keys::TOP_DIRECTORS,
                AggregateValue::Counts(self.top_n_multivalue(t, DIRECTOR, settings.top_people)),
            );
        }

        if t.has(CAST) {
            view.insert(
                keys::TOP_CAST,
                AggregateValue::Counts(self.top_n_multivalue(t, CAST, settings.top_people)),
            );
        }

        if t.has(YEAR_ADDED) && t.has(TYPE) {
            view.insert(
                keys::PER_YEAR_BY_TYPE,
                AggregateValue::Series(self.grouped_time_series(t, TYPE)),
            );
        }

        if t.has(YEAR_ADDED) && t.has(LISTED_IN) {
            view.insert(
                keys::GENRE_TRENDS,
                AggregateValue::Series(self.multivalue_time_series(t, LISTED_IN, settings.trend_genres)),
            );
        }

        if t.has(DATE_ADDED) {
            view.insert(
                keys::MONTHLY_DISTRIBUTION,
                AggregateValue::Months(self.monthly_distribution(t, settings.complete_month_axis)),
            );
        }

        if t.has(DURATION) && t.has(TYPE) {
            view.insert(
                keys::DURATION_MINUTES,
                AggregateValue::Values(self.duration_minutes_distribution(t)),
            );
            view.insert(
                keys::MEAN_DURATION_MINUTES,
                AggregateValue::Number(self.mean_duration_minutes(t)),
            );
        }

        view.insert(keys::TOP_GENRE, AggregateValue::Text(self.mode(t, LISTED_IN, true)));
        view.insert(keys::TOP_COUNTRY, AggregateValue::Text(self.mode(t, COUNTRY, true)));

        debug!("Computed {} aggregates over {} rows", view.len(), t.height());
        view
    }
}

fn into_series(buckets: BTreeMap<(i32, &str), usize>) -> Vec<SeriesPoint> {
    buckets
        .into_iter()
        .map(|((year, group), count)| SeriesPoint {
            year,
            group: group.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::DatasetNormalizer;
    use polars::prelude::*;

    fn table(df: DataFrame) -> CatalogTable {
        DatasetNormalizer::new().normalize(df, None).unwrap()
    }

    fn catalog() -> CatalogTable {
        table(
            df![
                "title" => ["A", "B", "C", "D", "E"],
                "type" => [Some("Movie"), Some("TV Show"), Some("Movie"), Some("Movie"), Some("TV Show")],
                "listed_in" => [Some("Dramas, Comedies"), Some("Comedies"), Some("Dramas"), None, Some("Kids' TV")],
                "country" => [Some("India"), Some("United States, India"), None, Some("Japan"), Some("United States")],
                "rating" => [Some("PG"), Some("TV-MA"), Some("PG"), None, Some("TV-Y")],
                "duration" => [Some("90 min"), Some("3 Seasons"), Some("bad"), Some("120 min"), Some("1 Season")],
                "date_added" => [Some("January 5, 2019"), Some("January 9, 2019"), Some("March 1, 2020"), None, Some("2020-12-24")],
            ]
            .unwrap(),
        )
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let ranked = super::rank(["b", "a", "a", "b", "c"].into_iter());
        assert_eq!(
            ranked,
            vec![
                CategoryCount::new("b", 2),
                CategoryCount::new("a", 2),
                CategoryCount::new("c", 1)
            ]
        );
    }

    #[test]
    fn test_top_n_multivalue_first_encountered_tie_break() {
        let t = table(
            df![
                "listed_in" => ["Drama, Comedy", "Comedy", "Drama"],
            ]
            .unwrap(),
        );
        let top = AggregationEngine::new().top_n_multivalue(&t, LISTED_IN, 2);
        assert_eq!(top, vec![CategoryCount::new("Drama", 2), CategoryCount::new("Comedy", 2)]);
    }

    #[test]
    fn test_top_n_multivalue_absent_column_is_empty() {
        let engine = AggregationEngine::new();
        assert!(engine.top_n_multivalue(&catalog(), DIRECTOR, 5).is_empty());
    }

    #[test]
    fn test_count_by_type_sums_to_total() {
        let engine = AggregationEngine::new();
        let t = catalog();
        let by_type = engine.count_by_type(&t);
        assert_eq!(by_type, vec![CategoryCount::new("Movie", 3), CategoryCount::new("TV Show", 2)]);
        let sum: usize = by_type.iter().map(|c| c.count).sum();
        assert_eq!(sum, engine.total_count(&t));
    }

    #[test]
    fn test_duration_distribution_keeps_movie_minutes() {
        let t = table(
            df![
                "type" => ["Movie", "TV Show", "Movie", "Movie"],
                "listed_in" => ["Dramas", "TV Dramas", "Comedies", "Dramas"],
                "duration" => ["90 min", "3 Seasons", "bad", ""],
            ]
            .unwrap(),
        );
        assert!(t.has(TYPE));
        let engine = AggregationEngine::new();
        assert_eq!(engine.duration_minutes_distribution(&t), vec![90]);
        assert_eq!(engine.mean_duration_minutes(&t), Some(90.0));
    }

    #[test]
    fn test_duration_minutes_parse() {
        assert_eq!(duration_minutes("90 min"), Some(90));
        assert_eq!(duration_minutes(" 45 min"), Some(45));
        assert_eq!(duration_minutes("min 90"), None);
        assert_eq!(duration_minutes(""), None);
    }

    #[test]
    fn test_mean_duration_is_none_without_movies() {
        let t = table(
            df![
                "type" => ["TV Show"],
                "listed_in" => ["TV Dramas"],
                "duration" => ["2 Seasons"],
            ]
            .unwrap(),
        );
        assert!(t.has(TYPE));
        assert!(AggregationEngine::new().duration_minutes_distribution(&t).is_empty());
        assert_eq!(AggregationEngine::new().mean_duration_minutes(&t), None);
    }

    #[test]
    fn test_grouped_time_series_excludes_null_years() {
        let series = AggregationEngine::new().grouped_time_series(&catalog(), TYPE);
        assert_eq!(
            series,
            vec![
                SeriesPoint { year: 2019, group: "Movie".into(), count: 1 },
                SeriesPoint { year: 2019, group: "TV Show".into(), count: 1 },
                SeriesPoint { year: 2020, group: "Movie".into(), count: 1 },
                SeriesPoint { year: 2020, group: "TV Show".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_multivalue_time_series_keeps_top_values() {
        let series = AggregationEngine::new().multivalue_time_series(&catalog(), LISTED_IN, 1);
        // Dramas and Comedies tie at 2; Dramas is encountered first.
        assert_eq!(
            series,
            vec![
                SeriesPoint { year: 2019, group: "Dramas".into(), count: 1 },
                SeriesPoint { year: 2020, group: "Dramas".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_monthly_distribution_order_and_axis() {
        let engine = AggregationEngine::new();
        let observed = engine.monthly_distribution(&catalog(), false);
        let months: Vec<(&str, usize)> = observed.iter().map(|m| (m.month.as_str(), m.count)).collect();
        assert_eq!(months, vec![("January", 2), ("March", 1), ("December", 1)]);

        let complete = engine.monthly_distribution(&catalog(), true);
        assert_eq!(complete.len(), 12);
        assert_eq!(complete[1].month, "February");
        assert_eq!(complete[1].count, 0);
    }

    #[test]
    fn test_mode_with_sentinel() {
        let engine = AggregationEngine::new();
        let t = catalog();
        assert_eq!(engine.mode(&t, COUNTRY, true), "India");
        assert_eq!(engine.mode(&t, RATING, false), "PG");
        assert_eq!(engine.mode(&t, DIRECTOR, true), NOT_AVAILABLE);

        let nulls = table(
            df![
                "title" => ["A", "B"],
                "country" => [None::<&str>, None],
            ]
            .unwrap(),
        );
        assert_eq!(engine.mode(&nulls, COUNTRY, true), NOT_AVAILABLE);
    }

    #[test]
    fn test_mode_tie_resolves_to_smallest_label() {
        let t = table(df!["country" => ["Japan", "India"]].unwrap());
        assert_eq!(AggregationEngine::new().mode(&t, COUNTRY, true), "India");
    }

    #[test]
    fn test_counts_and_uniques() {
        let engine = AggregationEngine::new();
        let t = catalog();
        assert_eq!(engine.count_equal(&t, TYPE, MOVIE), 3);
        assert_eq!(engine.count_equal(&t, TYPE, TV_SHOW), 2);
        assert_eq!(engine.unique_multivalue_count(&t, COUNTRY), 3);
        assert_eq!(
            engine.value_counts(&t, RATING, Some(1)),
            vec![CategoryCount::new("PG", 2)]
        );
    }

    #[test]
    fn test_compute_omits_absent_columns() {
        let t = table(df!["title" => ["A", "B"]].unwrap());
        let view = AggregationEngine::new()
            .compute(&t, &FilterSelection::unrestricted(), &AggregationSettings::default())
            .unwrap();

        assert_eq!(view.count(keys::TOTAL_COUNT), Some(2));
        assert!(!view.contains(keys::COUNT_BY_TYPE));
        assert!(!view.contains(keys::PER_YEAR_BY_TYPE));
        assert_eq!(view.counts(keys::TOP_GENRES), Some(&[][..]));
        assert_eq!(view.text(keys::TOP_COUNTRY), Some(NOT_AVAILABLE));
    }

    #[test]
    fn test_compute_on_empty_filter_result() {
        let t = catalog();
        let filter = FilterSelection::unrestricted().with_ratings(["NC-17"]);
        let view = AggregationEngine::new()
            .compute(&t, &filter, &AggregationSettings::default())
            .unwrap();

        assert_eq!(view.count(keys::TOTAL_COUNT), Some(0));
        assert_eq!(view.counts(keys::COUNT_BY_TYPE), Some(&[][..]));
        assert_eq!(view.number(keys::MEAN_DURATION_MINUTES), None);
        assert_eq!(view.text(keys::TOP_GENRE), Some(NOT_AVAILABLE));
    }
}
