//! # Run Statistics
//!
//! - `histogram` - fixed-binning 1-D and 2-D histograms
//! - `catalog` - the histogram declaration table
//! - `book` - histograms by name
//! - `sink` - per-event accumulation and output subset routing
//! - `summary` - counters and checksums written at the end of a run

pub mod book;
pub mod catalog;
pub mod histogram;
pub mod sink;
pub mod summary;

pub use book::{Histogram, HistogramBook};
pub use catalog::{HistogramCatalog, HistogramKind, HistogramSpec};
pub use histogram::{Axis, BinPlacement, Histogram1D, Histogram2D};
pub use sink::{OutputSubset, StatisticsSink};
pub use summary::{sha256_hex, HistogramFileInfo, RunCounters, RunSummary};
