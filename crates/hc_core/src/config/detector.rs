//! Detector geometry constants.

use serde::{Deserialize, Serialize};

/// Fixed constants of the detector module under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConstants {
    /// Module number (single-module detector)
    pub module: u32,
    /// Tracker/calorimeter side under commissioning
    pub side: u32,
    /// Number of radial drift cell layers
    pub total_layers: u32,
    /// Layer closest to the calorimeter wall
    pub last_layer: u32,
    /// Half width (mm) of the z window used for track/calorimeter association
    pub association_half_window: f64,
    /// Calorimeter columns per wall
    pub calo_columns: u32,
    /// Calorimeter blocks per column
    pub calo_rows: u32,
}

impl Default for DetectorConstants {
    fn default() -> Self {
        Self {
            module: 0,
            side: 1,
            total_layers: 9,
            last_layer: 8,
            association_half_window: 185.0,
            calo_columns: 20,
            calo_rows: 13,
        }
    }
}

/// Parameters of the reference calorimeter wall locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// |x| of the front face of each main wall (mm)
    pub wall_x: f64,
    /// Block spacing along y (mm)
    pub column_pitch: f64,
    /// Block spacing along z (mm)
    pub row_pitch: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            wall_x: 4350.0,
            column_pitch: 259.0,
            row_pitch: 259.0,
        }
    }
}
