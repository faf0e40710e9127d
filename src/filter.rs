//! Filter Selection
//!
//! Narrowing predicates applied before every aggregate, in a fixed order:
//! type, year range, rating, genre, country. Each is an AND.
//!
//! An empty selection means "no restriction", never "select nothing".

use crate::error::Result;
use crate::multivalue::{contains_any, explode};
use crate::schema::{COUNTRY, LISTED_IN, RATING, TITLE, TYPE};
use crate::table::CatalogTable;
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Inclusive year range over `year_added`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }
}

/// The full, unrestricted choice set, derived once from the loaded table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterDefaults {
    pub types: Vec<String>,
    pub year_span: Option<YearRange>,
    pub ratings: Vec<String>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
}

impl FilterDefaults {
    pub fn from_table(table: &CatalogTable) -> Self {
        let distinct = |column: &str| -> Vec<String> {
            table
                .text(column)
                .map(|values| values.into_iter().flatten().unique().map(String::from).collect())
                .unwrap_or_default()
        };
        let distinct_exploded = |column: &str| -> Vec<String> {
            table
                .text(column)
                .map(|values| {
                    values
                        .into_iter()
                        .flatten()
                        .flat_map(explode)
                        .unique()
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };

        let year_span = table.years().and_then(|years| {
            let (min, max) = years.into_iter().flatten().minmax().into_option()?;
            Some(YearRange::new(min, max))
        });

        Self {
            types: distinct(TYPE),
            year_span,
            ratings: distinct(RATING),
            genres: distinct_exploded(LISTED_IN),
            countries: distinct_exploded(COUNTRY),
        }
    }
}

/// User-selected filter state, rebuilt per interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub types: Vec<String>,
    pub year_range: Option<YearRange>,
    pub ratings: Vec<String>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
}

impl FilterSelection {
    /// Nothing chosen: no restriction on any axis.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Every type chosen, as a freshly opened dashboard shows it. The year
    /// axis starts open so rows without a `year_added` stay visible.
    pub fn full(defaults: &FilterDefaults) -> Self {
        Self {
            types: defaults.types.clone(),
            ..Self::default()
        }
    }

    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_year_range(mut self, min: i32, max: i32) -> Self {
        self.year_range = Some(YearRange::new(min, max));
        self
    }

    pub fn with_ratings<S: Into<String>>(mut self, ratings: impl IntoIterator<Item = S>) -> Self {
        self.ratings = ratings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_genres<S: Into<String>>(mut self, genres: impl IntoIterator<Item = S>) -> Self {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_countries<S: Into<String>>(mut self, countries: impl IntoIterator<Item = S>) -> Self {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    fn restricts_types(&self, defaults: &FilterDefaults) -> bool {
        if self.types.is_empty() {
            return false;
        }
        let chosen: HashSet<&str> = self.types.iter().map(String::as_str).collect();
        let all: HashSet<&str> = defaults.types.iter().map(String::as_str).collect();
        chosen != all
    }

    /// Apply the selection, returning the narrowed table.
    pub fn apply(&self, table: &CatalogTable) -> Result<CatalogTable> {
        let defaults = table.defaults();
        let mut keep = vec![true; table.height()];

        if self.restricts_types(defaults) {
            if let Some(types) = table.text(TYPE) {
                narrow(&mut keep, types.into_iter(), |t| {
                    t.map_or(false, |t| self.types.iter().any(|s| s == t))
                });
            }
        }

        // An explicit range drops rows without a year.
        if let Some(range) = self.year_range {
            if let Some(years) = table.years() {
                narrow(&mut keep, years.into_iter(), |y| y.map_or(false, |y| range.contains(y)));
            }
        }

        if !self.ratings.is_empty() {
            if let Some(ratings) = table.text(RATING) {
                narrow(&mut keep, ratings.into_iter(), |r| {
                    r.map_or(false, |r| self.ratings.iter().any(|s| s == r))
                });
            }
        }

        if !self.genres.is_empty() {
            if let Some(genres) = table.text(LISTED_IN) {
                narrow(&mut keep, genres.into_iter(), |g| {
                    g.map_or(false, |g| contains_any(g, &self.genres))
                });
            }
        }

        if !self.countries.is_empty() {
            if let Some(countries) = table.text(COUNTRY) {
                narrow(&mut keep, countries.into_iter(), |c| {
                    c.map_or(false, |c| contains_any(c, &self.countries))
                });
            }
        }

        let kept = keep.iter().filter(|k| **k).count();
        debug!("Filter kept {} of {} rows", kept, table.height());

        select_rows(table, keep)
    }
}

/// Case-insensitive title search. An empty term returns the table unchanged;
/// a table without titles yields no hits.
pub fn search_titles(table: &CatalogTable, term: &str) -> Result<CatalogTable> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(table.clone());
    }

    let needle = term.to_lowercase();
    let keep: Vec<bool> = match table.text(TITLE) {
        Some(titles) => titles
            .into_iter()
            .map(|t| t.map_or(false, |t| t.to_lowercase().contains(&needle)))
            .collect(),
        None => vec![false; table.height()],
    };

    select_rows(table, keep)
}

fn narrow<T>(keep: &mut [bool], values: impl Iterator<Item = T>, predicate: impl Fn(T) -> bool) {
    for (slot, value) in keep.iter_mut().zip(values) {
        if *slot && !predicate(value) {
            *slot = false;
        }
    }
}

fn select_rows(table: &CatalogTable, keep: Vec<bool>) -> Result<CatalogTable> {
    if keep.iter().all(|k| *k) {
        return Ok(table.clone());
    }
    let mask: BooleanChunked = keep.into_iter().collect();
    let frame = table.frame().filter(&mask)?;
    Ok(table.with_frame(frame))
}
