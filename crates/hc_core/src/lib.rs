//! # hc_core - Half-Commissioning Event Classification
//!
//! Classifies simulated detector events of the half-commissioning test and
//! accumulates run statistics.
//!
//! ## Pipeline
//! - drift cell re-triggers are removed, earliest hit per cell wins
//! - calorimeter and drift cell hits are filtered by rule-based selectors
//! - calorimeter steps are folded into per-block summaries over threshold
//! - the event topology is derived (calorimeter count, full track, track to
//!   calorimeter association)
//! - counters, histograms and filtered output subsets are filled
//!
//! Processing is sequential; nothing but the [`StatisticsSink`] outlives an
//! event.

pub mod analysis;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hits;
pub mod stats;

pub use analysis::{EventClassification, EventClassifier, Topology, TrackClass};
pub use config::{AnalysisConfig, DetectorConstants, SelectionConfig, SelectionProfile};
pub use error::{HcError, Result};
pub use event::{EventReader, EventRecord, EventWriter, RawHit, ReaderLimits, SimulatedData};
pub use geometry::{CaloWallLocator, GeometryLocator, Position, Selector, SensorId};
pub use hits::{aggregate, deduplicate, CaloHitSummary};
pub use stats::{HistogramBook, HistogramCatalog, OutputSubset, RunSummary, StatisticsSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
