use catalog_insights::aggregate::AggregationEngine;
use catalog_insights::cache::DatasetCache;
use catalog_insights::charts::{chart_specs, render_all, JsonChartRenderer};
use catalog_insights::config::AppConfig;
use catalog_insights::dashboard::{export_csv, export_file_name, DashboardSession, DashboardSnapshot};
use catalog_insights::deck::{Deck, MarkdownDeckWriter, PresentationSink};
use catalog_insights::filter::{FilterSelection, YearRange};
use catalog_insights::table::CatalogTable;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-insights")]
#[command(about = "Descriptive analytics over a media catalog CSV")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset path; repeat to give an ordered fallback list
    #[arg(long = "data", global = true)]
    data: Vec<PathBuf>,

    /// Output directory for charts, decks and exports
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the aggregate view for a filter selection as JSON
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the full dashboard snapshot as JSON
    Dashboard {
        #[command(flatten)]
        filter: FilterArgs,

        /// Case-insensitive title search
        #[arg(long, default_value = "")]
        search: String,

        /// Rows in the explore preview
        #[arg(long, default_value_t = catalog_insights::dashboard::DEFAULT_ROWS)]
        rows: usize,
    },
    /// Render chart specs and write the slide deck
    Deck,
    /// Write the filtered table as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (default: <out_dir>/catalog_filtered_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Default)]
struct FilterArgs {
    /// Content type to keep (repeatable)
    #[arg(long = "type")]
    types: Vec<String>,

    /// First year added (inclusive)
    #[arg(long)]
    year_from: Option<i32>,

    /// Last year added (inclusive)
    #[arg(long)]
    year_to: Option<i32>,

    /// Rating to keep (repeatable)
    #[arg(long = "rating")]
    ratings: Vec<String>,

    /// Genre text to match (repeatable, substring match)
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Country text to match (repeatable, substring match)
    #[arg(long = "country")]
    countries: Vec<String>,
}

impl FilterArgs {
    /// Build a selection. No year flags leaves the year axis open; a single
    /// bound is completed from the table's span.
    fn selection(&self, table: &CatalogTable) -> FilterSelection {
        let span = table.defaults().year_span;
        let year_range = match (self.year_from, self.year_to) {
            (None, None) => None,
            (from, to) => {
                let min = from.or(span.map(|s| s.min)).unwrap_or(i32::MIN);
                let max = to.or(span.map(|s| s.max)).unwrap_or(i32::MAX);
                Some(YearRange::new(min, max))
            }
        };

        let mut selection = FilterSelection::full(table.defaults())
            .with_ratings(self.ratings.clone())
            .with_genres(self.genres.clone())
            .with_countries(self.countries.clone());
        selection.year_range = year_range;
        if !self.types.is_empty() {
            selection.types = self.types.clone();
        }
        selection
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the configured dataset. Failures are reported once, through the returned error.
fn load_table(cache: &mut DatasetCache, config: &AppConfig) -> Result<Arc<CatalogTable>> {
    cache
        .get_or_load(&config.data_paths)
        .context("Could not load data; place the dataset at one of the configured data paths")
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if !args.data.is_empty() {
        config.data_paths = args.data.clone();
    }
    if let Some(out_dir) = args.out_dir.clone() {
        config.set_out_dir(out_dir);
    }

    let mut cache = DatasetCache::new();
    let table = load_table(&mut cache, &config)?;

    match args.command {
        Commands::Summary { filter } => {
            let selection = filter.selection(&table);
            let view = AggregationEngine::new().compute(&table, &selection, &config.aggregation)?;
            print_json(&view)?;
        }
        Commands::Dashboard { filter, search, rows } => {
            let session = DashboardSession {
                filter: filter.selection(&table),
                search,
                rows_to_show: rows,
            };
            let snapshot = DashboardSnapshot::build(&table, &session, &config.aggregation)?;
            print_json(&snapshot)?;
        }
        Commands::Deck => {
            let view = AggregationEngine::new().compute(
                &table,
                &FilterSelection::unrestricted(),
                &config.aggregation,
            )?;

            let specs = chart_specs(&view);
            let batch = render_all(&JsonChartRenderer, &specs, &config.chart_dir());
            for omission in &batch.omitted {
                info!("Chart '{}' left out of the deck: {}", omission.key, omission.reason);
            }

            let source_label = table
                .source()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "in-memory table".to_string());
            let deck = Deck::build(
                &config.deck_title,
                &source_label,
                &view,
                &batch,
                chrono::Local::now().naive_local(),
            );

            let mut writer = MarkdownDeckWriter::new(config.out_dir.join("Catalog_Analysis_Presentation.md"));
            let path = writer.write(&deck)?;
            println!("Presentation created: {}", path.display());
        }
        Commands::Export { filter, output } => {
            let filtered = filter.selection(&table).apply(&table)?;
            let path = output.unwrap_or_else(|| {
                config
                    .out_dir
                    .join(export_file_name(chrono::Local::now().date_naive()))
            });
            export_csv(&filtered, &path)?;
            println!("Exported {} rows to {}", filtered.height(), path.display());
        }
    }

    Ok(())
}
