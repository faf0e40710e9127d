pub mod aggregate;
pub mod cache;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod deck;
pub mod error;
pub mod filter;
pub mod multivalue;
pub mod normalizer;
pub mod schema;
pub mod table;
pub mod view;

pub use aggregate::{AggregationEngine, AggregationSettings};
pub use error::{CatalogError, Result};
pub use filter::{FilterDefaults, FilterSelection, YearRange};
pub use normalizer::DatasetNormalizer;
pub use table::CatalogTable;
pub use view::AggregateView;
