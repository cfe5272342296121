//! Drift cell re-trigger removal.
//!
//! A cell hit several times in one event only counts once: the hit with the
//! earliest start time is kept and the others are discarded. On an exact
//! time tie the hit seen first wins.

use crate::event::RawHit;
use crate::geometry::SensorId;
use std::collections::HashMap;

/// `true` for every hit that is a repeat trigger of an earlier-timed hit on
/// the same cell.
pub fn repeat_trigger_mask(hits: &[RawHit]) -> Vec<bool> {
    // cell -> index of the hit currently kept for it
    let mut kept: HashMap<&SensorId, usize> = HashMap::with_capacity(hits.len());
    let mut repeated = vec![false; hits.len()];

    for (index, hit) in hits.iter().enumerate() {
        match kept.get_mut(&hit.sensor_id) {
            None => {
                kept.insert(&hit.sensor_id, index);
            }
            Some(best) => {
                if hit.time_start < hits[*best].time_start {
                    repeated[*best] = true;
                    *best = index;
                } else {
                    repeated[index] = true;
                }
            }
        }
    }

    repeated
}

/// Hits to carry forward, in input order, one per cell.
pub fn deduplicate(hits: &[RawHit]) -> Vec<&RawHit> {
    hits.iter()
        .zip(repeat_trigger_mask(hits))
        .filter(|(_, repeated)| !repeated)
        .map(|(hit, _)| hit)
        .collect()
}
