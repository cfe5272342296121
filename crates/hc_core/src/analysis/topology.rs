//! Event topologies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracker content relative to the calorimeter hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackClass {
    /// No drift cell layer hit
    NoTrack,
    /// Some layers hit, but not all of them
    PartialTrack,
    /// All layers hit, no calorimeter within the association window
    UnassociatedTrack,
    /// All layers hit and at least one calorimeter associated
    AssociatedTrack,
}

impl TrackClass {
    pub fn from_layers(layer_count: usize, total_layers: usize, associated: bool) -> Self {
        if layer_count == 0 {
            TrackClass::NoTrack
        } else if layer_count < total_layers {
            TrackClass::PartialTrack
        } else if associated {
            TrackClass::AssociatedTrack
        } else {
            TrackClass::UnassociatedTrack
        }
    }

    pub fn is_full_track(&self) -> bool {
        matches!(
            self,
            TrackClass::UnassociatedTrack | TrackClass::AssociatedTrack
        )
    }
}

/// Classification of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Nothing in the selected region
    Empty,
    /// Drift cells only, no calorimeter over threshold
    TrackerOnly,
    OneCalo(TrackClass),
    TwoCalo(TrackClass),
    /// Three or more calorimeters, not sub-classified
    ManyCalo(usize),
}

impl Topology {
    pub fn calo_count(&self) -> usize {
        match self {
            Topology::Empty | Topology::TrackerOnly => 0,
            Topology::OneCalo(_) => 1,
            Topology::TwoCalo(_) => 2,
            Topology::ManyCalo(n) => *n,
        }
    }

    pub fn track_class(&self) -> Option<TrackClass> {
        match self {
            Topology::OneCalo(track) | Topology::TwoCalo(track) => Some(*track),
            _ => None,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Topology::Empty => write!(f, "empty"),
            Topology::TrackerOnly => write!(f, "tracker only"),
            Topology::OneCalo(track) => write!(f, "one calo, {:?}", track),
            Topology::TwoCalo(track) => write!(f, "two calos, {:?}", track),
            Topology::ManyCalo(n) => write!(f, "{} calos", n),
        }
    }
}
