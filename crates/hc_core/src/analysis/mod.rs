//! # Event Analysis
//!
//! Per-event topology classification.
//!
//! - `classifier` - runs selection, aggregation and deduplication on one event
//! - `topology` - the finite set of event topologies

pub mod classifier;
pub mod topology;

pub use classifier::{EventClassification, EventClassifier};
pub use topology::{Topology, TrackClass};
