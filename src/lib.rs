// Sustainability KPI dashboard core.
//
// Turns an in-memory list of building projects into the numbers a KPI
// dashboard shows: certification rating distributions, per-sector
// statistics and chart tables, plus CSV exports that match the on-screen
// figures exactly.
//
// The pipeline, leaf first:
// - `units` formats unit labels for display and export.
// - `taxonomy` holds sectors, certification schemes and the KPI catalog.
// - `transform` scales per-area values to totals.
// - `bucketer` groups projects into rating buckets.
// - `aggregator` computes per-sector statistics.
// - `reports` builds tables and chart data; `output` renders payloads.

pub mod aggregator;
pub mod benchmarks;
pub mod bucketer;
pub mod config;
pub mod confirm;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod taxonomy;
pub mod transform;
pub mod types;
pub mod units;
pub mod util;

pub use aggregator::{aggregate_by_sector, SectorStats, SectorSummary};
pub use bucketer::{bar_width, bucket_by_rating, RatingBuckets};
pub use error::{ConfigError, ExportError, LoadError};
pub use reports::{build_chart, BuildContext, ChartData, ChartMode, ChartRequest};
pub use taxonomy::Taxonomy;
pub use transform::{to_display_value, AreaLookup};
pub use types::{Project, Sector, ValueType};
pub use units::format_unit;
