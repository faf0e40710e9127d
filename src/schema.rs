//! Schema Detection
//!
//! Canonical column names, the two known input shapes, and the capability
//! descriptor every aggregate consults instead of probing the frame.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TITLE: &str = "title";
pub const TYPE: &str = "type";
pub const CATEGORY: &str = "category";
pub const LISTED_IN: &str = "listed_in";
pub const COUNTRY: &str = "country";
pub const DIRECTOR: &str = "director";
pub const CAST: &str = "cast";
pub const DATE_ADDED: &str = "date_added";
pub const RELEASE_DATE: &str = "release_date";
pub const YEAR_ADDED: &str = "year_added";
pub const DURATION: &str = "duration";
pub const RATING: &str = "rating";

/// `type` value for films; duration aggregates only consider these rows.
pub const MOVIE: &str = "Movie";
pub const TV_SHOW: &str = "TV Show";

/// Delimiter joining the values of a multi-valued cell.
pub const MULTI_VALUE_DELIMITER: &str = ", ";

/// Normalize a raw header label: trim, lowercase, spaces to underscores.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Which of the known input shapes a freshly loaded table has.
///
/// The shapes disagree on what `type` means, so the kind is resolved once,
/// before any rename is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaKind {
    /// `type` is the content category and genres live in `listed_in`.
    Canonical,
    /// Raw export: `category` holds the content category, `type` (if present) holds genres.
    RawCategory,
    /// No `category`, and `type` holds genres because `listed_in` is missing.
    GenreTyped,
}

impl SchemaKind {
    /// Detect the shape from normalized column labels.
    pub fn detect<S: AsRef<str>>(columns: &[S]) -> Self {
        let has = |name: &str| columns.iter().any(|c| c.as_ref() == name);

        if has(CATEGORY) {
            SchemaKind::RawCategory
        } else if has(TYPE) && !has(LISTED_IN) {
            SchemaKind::GenreTyped
        } else {
            SchemaKind::Canonical
        }
    }
}

/// Column presence, computed once after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCapabilities {
    columns: BTreeSet<String>,
}

impl SchemaCapabilities {
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Release Date "), "release_date");
        assert_eq!(normalize_label("Show_Id"), "show_id");
        assert_eq!(normalize_label("listed_in"), "listed_in");
    }

    #[test]
    fn test_detect_schema_kind() {
        let raw = ["show_id", "category", "title", "type", "release_date"];
        assert_eq!(SchemaKind::detect(&raw), SchemaKind::RawCategory);

        let cleaned = ["title", "type", "listed_in", "date_added"];
        assert_eq!(SchemaKind::detect(&cleaned), SchemaKind::Canonical);

        let genre_typed = ["title", "type"];
        assert_eq!(SchemaKind::detect(&genre_typed), SchemaKind::GenreTyped);

        let bare: [&str; 1] = ["title"];
        assert_eq!(SchemaKind::detect(&bare), SchemaKind::Canonical);
    }

    #[test]
    fn test_capabilities() {
        let caps = SchemaCapabilities::from_columns(["title", "type"]);
        assert!(caps.has("title"));
        assert!(!caps.has("country"));
        assert_eq!(caps.columns().count(), 2);
    }
}
