//! # Hit Processing
//!
//! - `aggregator` - per-block calorimeter summaries with energy threshold
//! - `dedup` - removal of re-triggered drift cells

pub mod aggregator;
pub mod dedup;

pub use aggregator::{aggregate, passes_threshold, CaloHitSummary, CaloSummaryMap};
pub use dedup::{deduplicate, repeat_trigger_mask};
