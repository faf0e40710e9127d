//! Slide Deck
//!
//! Builds an ordered sequence of slides from an aggregate view and the charts
//! that rendered successfully, then hands it to a `PresentationSink`.

use crate::aggregate::NOT_AVAILABLE;
use crate::charts::RenderBatch;
use crate::error::{CatalogError, Result};
use crate::view::{keys, AggregateView, MonthCount};
use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlideContent {
    Title { subtitle: Option<String> },
    Bullets { items: Vec<String> },
    Chart { image: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub content: SlideContent,
}

impl Slide {
    fn bullets(title: &str, items: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            content: SlideContent::Bullets { items },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

/// Format an integer with thousands separators (`7789` -> `7,789`).
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl Deck {
    /// Title slide, executive summary, one slide per rendered chart, takeaways.
    pub fn build(
        title: &str,
        source_label: &str,
        view: &AggregateView,
        charts: &RenderBatch,
        generated_at: NaiveDateTime,
    ) -> Self {
        let total = view.count(keys::TOTAL_COUNT).unwrap_or(0);
        let mut slides = Vec::new();

        slides.push(Slide {
            title: title.to_string(),
            content: SlideContent::Title {
                subtitle: Some(format!(
                    "Auto-generated on {}\nSource: {} ({} rows)",
                    generated_at.format("%Y-%m-%d %H:%M"),
                    source_label,
                    group_thousands(total)
                )),
            },
        });

        slides.push(Slide::bullets("Executive Summary", executive_summary(view, total)));

        for chart in &charts.rendered {
            slides.push(Slide {
                title: chart.slide_title.clone(),
                content: SlideContent::Chart {
                    image: chart.path.clone(),
                },
            });
        }

        let takeaways = takeaways(view, total);
        if !takeaways.is_empty() {
            slides.push(Slide::bullets("Key Takeaways", takeaways));
        }

        Self { slides }
    }
}

fn executive_summary(view: &AggregateView, total: usize) -> Vec<String> {
    let movies = view.count(keys::MOVIE_COUNT).unwrap_or(0);
    let shows = view.count(keys::TV_SHOW_COUNT).unwrap_or(0);
    let mut items = vec![
        format!("Total titles: {}", group_thousands(total)),
        format!(
            "Movies vs TV Shows: {} vs {}",
            group_thousands(movies),
            group_thousands(shows)
        ),
        format!("Top Genre: {}", view.text(keys::TOP_GENRE).unwrap_or(NOT_AVAILABLE)),
        format!("Top Content Country: {}", view.text(keys::TOP_COUNTRY).unwrap_or(NOT_AVAILABLE)),
    ];

    if let Some((year, count)) = peak_year(view) {
        items.push(format!(
            "Peak year for additions: {} ({} titles)",
            year,
            group_thousands(count)
        ));
    }

    items
}

/// Year with the most additions across all groups; earliest year wins ties.
fn peak_year(view: &AggregateView) -> Option<(i32, usize)> {
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for point in view.series(keys::PER_YEAR_BY_TYPE)? {
        *per_year.entry(point.year).or_insert(0) += point.count;
    }
    per_year
        .into_iter()
        .fold(None, |best: Option<(i32, usize)>, (year, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((year, count)),
        })
}

/// Month with the most additions; the earliest month wins ties.
fn busiest_month(months: &[MonthCount]) -> Option<&MonthCount> {
    months
        .iter()
        .filter(|m| m.count > 0)
        .fold(None, |best: Option<&MonthCount>, month| match best {
            Some(b) if b.count >= month.count => best,
            _ => Some(month),
        })
}

fn takeaways(view: &AggregateView, total: usize) -> Vec<String> {
    let mut items = Vec::new();

    if let Some(genres) = view.counts(keys::TOP_GENRES).filter(|g| !g.is_empty()) {
        let leading = genres.iter().take(3).map(|g| g.label.as_str()).join(", ");
        items.push(format!("Leading genres: {}", leading));
    }

    if let (Some(shows), true) = (view.count(keys::TV_SHOW_COUNT), total > 0) {
        let share = shows as f64 / total as f64 * 100.0;
        items.push(format!("TV Shows make up {:.0}% of titles", share));
    }

    if let Some(mean) = view.number(keys::MEAN_DURATION_MINUTES) {
        items.push(format!("Average movie runs {:.0} minutes", mean));
    }

    if let Some(month) = view.months(keys::MONTHLY_DISTRIBUTION).and_then(busiest_month) {
        items.push(format!("Busiest month for additions: {}", month.month));
    }

    if let Some(rating) = view.counts(keys::TOP_RATINGS).and_then(|r| r.first()) {
        items.push(format!("Most common rating: {}", rating.label));
    }

    items
}

/// Serializes a finished deck into a distributable document.
pub trait PresentationSink {
    fn write(&mut self, deck: &Deck) -> Result<PathBuf>;
}

/// Writes the deck as Markdown, one `---`-separated section per slide.
#[derive(Debug, Clone)]
pub struct MarkdownDeckWriter {
    path: PathBuf,
}

impl MarkdownDeckWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn render(deck: &Deck) -> String {
        deck.slides
            .iter()
            .map(|slide| match &slide.content {
                SlideContent::Title { subtitle } => {
                    let mut section = format!("# {}\n", slide.title);
                    if let Some(subtitle) = subtitle {
                        section.push('\n');
                        section.push_str(&subtitle.lines().join("  \n"));
                        section.push('\n');
                    }
                    section
                }
                SlideContent::Bullets { items } => {
                    let body = items.iter().map(|item| format!("- {}", item)).join("\n");
                    format!("## {}\n\n{}\n", slide.title, body)
                }
                SlideContent::Chart { image } => {
                    format!("## {}\n\n![{}]({})\n", slide.title, slide.title, image.display())
                }
            })
            .join("\n---\n\n")
    }
}

impl PresentationSink for MarkdownDeckWriter {
    fn write(&mut self, deck: &Deck) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, Self::render(deck)).map_err(|e| {
            CatalogError::Presentation(format!("Failed to write deck {}: {}", self.path.display(), e))
        })?;

        info!("Presentation created: {} ({} slides)", self.path.display(), deck.slides.len());
        Ok(self.path.clone())
    }
}
