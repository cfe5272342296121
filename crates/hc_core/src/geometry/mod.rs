//! # Geometry Module
//!
//! Sensor identifiers and the narrow geometry interface used by the
//! classifier.
//!
//! ## Submodules
//!
//! - `selector` - rule-based selection of sensor identifiers
//! - `locator` - row z / block position queries for calorimeter blocks

pub mod locator;
pub mod selector;

pub use locator::{CaloWallLocator, GeometryLocator};
pub use selector::{FieldPredicate, Selector, SelectorRule};

use crate::error::{HcError, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 3-D position in millimetres.
pub type Position = Vector3<f64>;

/// Address index of the column (calorimeter) or layer (drift cell).
pub const COLUMN_INDEX: usize = 2;
/// Address index of the row for both sensor families.
pub const ROW_INDEX: usize = 3;

/// Sensor category, i.e. the geometry type of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Scintillator block of the main calorimeter wall
    CalorimeterBlock,
    /// Sensitive core of a Geiger drift cell
    DriftCellCore,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::CalorimeterBlock, Category::DriftCellCore];

    /// Name used in selector rules.
    pub fn name(&self) -> &'static str {
        match self {
            Category::CalorimeterBlock => "calorimeter_block",
            Category::DriftCellCore => "drift_cell_core",
        }
    }

    /// Address field names, in address order.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Category::CalorimeterBlock => &["module", "side", "column", "row", "part"],
            Category::DriftCellCore => &["module", "side", "layer", "row"],
        }
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields().iter().position(|f| *f == field)
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| HcError::configuration(format!("unknown category '{}'", name)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured identifier of a physical sensor.
///
/// Ordering is lexicographic: category first, then the address fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorId {
    pub category: Category,
    pub address: Vec<u32>,
}

impl SensorId {
    pub fn new(category: Category, address: Vec<u32>) -> Self {
        Self { category, address }
    }

    pub fn calo(module: u32, side: u32, column: u32, row: u32, part: u32) -> Self {
        Self::new(
            Category::CalorimeterBlock,
            vec![module, side, column, row, part],
        )
    }

    pub fn geiger(module: u32, side: u32, layer: u32, row: u32) -> Self {
        Self::new(Category::DriftCellCore, vec![module, side, layer, row])
    }

    /// Address field at `index`, if present.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.address.get(index).copied()
    }

    pub fn module(&self) -> Option<u32> {
        self.get(0)
    }

    pub fn side(&self) -> Option<u32> {
        self.get(1)
    }

    pub fn column(&self) -> Option<u32> {
        self.get(COLUMN_INDEX)
    }

    /// Same slot as `column`, named for drift cells.
    pub fn layer(&self) -> Option<u32> {
        self.get(COLUMN_INDEX)
    }

    pub fn row(&self) -> Option<u32> {
        self.get(ROW_INDEX)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let address: Vec<String> = self.address.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}:{}]", self.category, address.join("."))
    }
}
