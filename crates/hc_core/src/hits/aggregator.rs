//! Calorimeter hit aggregation.
//!
//! Step hits on the same calorimeter block are merged into one summary:
//! summed energy, earliest start time and the start position with the
//! smallest x. Summaries whose energy stays under the threshold are dropped.

use crate::event::RawHit;
use crate::geometry::{Position, SensorId, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summaries keyed by block, in identifier order.
pub type CaloSummaryMap = BTreeMap<SensorId, CaloHitSummary>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaloHitSummary {
    pub sensor_id: SensorId,
    /// Summed deposit, MeV
    pub energy: f64,
    /// Earliest step start time, ns
    pub time: f64,
    /// Start position of the contributing step with the smallest x
    pub left_most_position: Position,
    /// Set by the classifier when a track reaches this block
    pub track_associated: bool,
}

impl CaloHitSummary {
    fn seed(hit: &RawHit) -> Self {
        Self {
            sensor_id: hit.sensor_id.clone(),
            energy: hit.energy_deposit,
            time: hit.time_start,
            left_most_position: hit.position_start,
            track_associated: false,
        }
    }

    fn absorb(&mut self, hit: &RawHit) {
        self.energy += hit.energy_deposit;
        if hit.time_start < self.time {
            self.time = hit.time_start;
        }
        if hit.position_start.x < self.left_most_position.x {
            self.left_most_position = hit.position_start;
        }
    }

    pub fn energy_kev(&self) -> f64 {
        self.energy * 1000.0
    }
}

/// Whether an energy in MeV reaches a threshold in keV.
pub fn passes_threshold(energy_mev: f64, threshold_kev: f64) -> bool {
    energy_mev * 1000.0 >= threshold_kev
}

/// Fold `hits` matching `selector` into per-block summaries, then drop the
/// summaries under `threshold_kev`.
///
/// Hits are folded in input order. No matching hit gives an empty map.
pub fn aggregate<'a, I>(hits: I, selector: &Selector, threshold_kev: f64) -> CaloSummaryMap
where
    I: IntoIterator<Item = &'a RawHit>,
{
    let folded = hits
        .into_iter()
        .filter(|hit| selector.matches(&hit.sensor_id))
        .fold(CaloSummaryMap::new(), |mut map, hit| {
            map.entry(hit.sensor_id.clone())
                .and_modify(|summary| summary.absorb(hit))
                .or_insert_with(|| CaloHitSummary::seed(hit));
            map
        });

    folded
        .into_iter()
        .filter(|(_, summary)| passes_threshold(summary.energy, threshold_kev))
        .collect()
}
