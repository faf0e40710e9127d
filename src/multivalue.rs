//! Helpers for delimiter-joined multi-valued cells (genres, countries, people).

use crate::schema::MULTI_VALUE_DELIMITER;

/// Split a cell on the literal `", "` delimiter, trimming and dropping empty parts.
pub fn explode(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(MULTI_VALUE_DELIMITER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// True when the raw cell text contains any of the needles.
///
/// Plain substring containment on the joined text: `"Com"` matches both
/// `"Comedies"` and `"Comics"`.
pub fn contains_any<S: AsRef<str>>(cell: &str, needles: &[S]) -> bool {
    needles.iter().any(|needle| cell.contains(needle.as_ref()))
}
