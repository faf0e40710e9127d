//! Aggregate View
//!
//! Named, read-only results of one (table, filter) evaluation. Renderers and
//! the deck builder consume these; nothing here points back into the table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the entries `AggregationEngine::compute` produces.
pub mod keys {
    pub const TOTAL_COUNT: &str = "total_count";
    pub const COUNT_BY_TYPE: &str = "count_by_type";
    pub const MOVIE_COUNT: &str = "movie_count";
    pub const TV_SHOW_COUNT: &str = "tv_show_count";
    pub const TOP_RATINGS: &str = "top_ratings";
    pub const TOP_GENRES: &str = "top_genres";
    pub const TOP_COUNTRIES: &str = "top_countries";
    pub const COUNTRY_COUNT: &str = "country_count";
    pub const TOP_DIRECTORS: &str = "top_directors";
    pub const TOP_CAST: &str = "top_cast";
    pub const PER_YEAR_BY_TYPE: &str = "per_year_by_type";
    pub const GENRE_TRENDS: &str = "genre_trends";
    pub const MONTHLY_DISTRIBUTION: &str = "monthly_distribution";
    pub const DURATION_MINUTES: &str = "duration_minutes_distribution";
    pub const MEAN_DURATION_MINUTES: &str = "mean_duration_minutes";
    pub const TOP_GENRE: &str = "top_genre";
    pub const TOP_COUNTRY: &str = "top_country";
}

/// One label and its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

impl CategoryCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Row count for one (year, group) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub group: String,
    pub count: usize,
}

/// Row count for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AggregateValue {
    Count(usize),
    Text(String),
    /// `None` where the statistic is undefined (e.g. a mean over no rows).
    Number(Option<f64>),
    Counts(Vec<CategoryCount>),
    Series(Vec<SeriesPoint>),
    Months(Vec<MonthCount>),
    Values(Vec<u32>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateView {
    values: BTreeMap<String, AggregateValue>,
}

impl AggregateView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: AggregateValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AggregateValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn count(&self, name: &str) -> Option<usize> {
        match self.get(name)? {
            AggregateValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            AggregateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            AggregateValue::Number(n) => *n,
            _ => None,
        }
    }

    pub fn counts(&self, name: &str) -> Option<&[CategoryCount]> {
        match self.get(name)? {
            AggregateValue::Counts(c) => Some(c),
            _ => None,
        }
    }

    pub fn series(&self, name: &str) -> Option<&[SeriesPoint]> {
        match self.get(name)? {
            AggregateValue::Series(s) => Some(s),
            _ => None,
        }
    }

    pub fn months(&self, name: &str) -> Option<&[MonthCount]> {
        match self.get(name)? {
            AggregateValue::Months(m) => Some(m),
            _ => None,
        }
    }

    pub fn values(&self, name: &str) -> Option<&[u32]> {
        match self.get(name)? {
            AggregateValue::Values(v) => Some(v),
            _ => None,
        }
    }
}
