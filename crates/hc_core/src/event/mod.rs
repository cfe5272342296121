//! # Event Records
//!
//! Simulated event records as read from the event containers. Each record
//! may carry a simulated data bank ("SD") with per-step hits partitioned by
//! hit category ("calo", "gg") and the true interaction vertex.

pub mod io;

pub use io::{ContainerFormat, EventReader, EventWriter, ReaderLimits};

use crate::geometry::{Position, SensorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hit category of calorimeter block step hits.
pub const CALO_HITS: &str = "calo";
/// Hit category of drift cell step hits.
pub const GEIGER_HITS: &str = "gg";

/// One energy deposit on a sensor during one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    pub sensor_id: SensorId,
    /// MeV
    pub energy_deposit: f64,
    /// ns
    pub time_start: f64,
    pub position_start: Position,
    pub position_stop: Position,
}

impl RawHit {
    pub fn new(sensor_id: SensorId, energy_deposit: f64, time_start: f64) -> Self {
        Self {
            sensor_id,
            energy_deposit,
            time_start,
            position_start: Position::zeros(),
            position_stop: Position::zeros(),
        }
    }

    pub fn with_positions(mut self, start: Position, stop: Position) -> Self {
        self.position_start = start;
        self.position_stop = stop;
        self
    }
}

/// Simulated data bank.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulatedData {
    pub vertex: Position,
    #[serde(default)]
    pub step_hits: BTreeMap<String, Vec<RawHit>>,
}

impl SimulatedData {
    pub fn new(vertex: Position) -> Self {
        Self {
            vertex,
            step_hits: BTreeMap::new(),
        }
    }

    pub fn has_step_hits(&self, category: &str) -> bool {
        self.step_hits
            .get(category)
            .map_or(false, |hits| !hits.is_empty())
    }

    /// Hits of `category`; empty when the category is absent.
    pub fn step_hits(&self, category: &str) -> &[RawHit] {
        self.step_hits
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_step_hit(&mut self, category: &str, hit: RawHit) {
        self.step_hits
            .entry(category.to_string())
            .or_default()
            .push(hit);
    }

    pub fn vertex(&self) -> Position {
        self.vertex
    }
}

/// One event record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    #[serde(rename = "SD", default, skip_serializing_if = "Option::is_none")]
    pub simulated_data: Option<SimulatedData>,
}

impl EventRecord {
    pub fn new(id: u64, simulated_data: SimulatedData) -> Self {
        Self {
            id,
            simulated_data: Some(simulated_data),
        }
    }

    /// A record without a simulated data bank.
    pub fn empty(id: u64) -> Self {
        Self {
            id,
            simulated_data: None,
        }
    }
}
