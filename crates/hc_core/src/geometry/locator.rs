//! Calorimeter block locator.
//!
//! The classifier only needs two queries from the geometry: the z of a
//! calorimeter row and the centre of a block. Anything implementing
//! [`GeometryLocator`] can be plugged in.

use super::Position;
use crate::config::{DetectorConstants, LocatorConfig};

pub trait GeometryLocator {
    /// z position of calorimeter row `row` on `side`.
    fn row_z(&self, side: u32, row: u32) -> f64;

    /// Centre of block (`column`, `row`) on `side`.
    fn block_position(&self, side: u32, column: u32, row: u32) -> Position;
}

/// Regular grid of blocks on the two main walls.
///
/// Side 0 sits at `-wall_x`, side 1 at `+wall_x`. Rows are stacked along z
/// and columns along y, both centred on the origin.
#[derive(Debug, Clone)]
pub struct CaloWallLocator {
    wall_x: f64,
    column_pitch: f64,
    row_pitch: f64,
    columns: u32,
    rows: u32,
}

impl CaloWallLocator {
    pub fn new(locator: &LocatorConfig, detector: &DetectorConstants) -> Self {
        Self {
            wall_x: locator.wall_x,
            column_pitch: locator.column_pitch,
            row_pitch: locator.row_pitch,
            columns: detector.calo_columns,
            rows: detector.calo_rows,
        }
    }

    fn centred(index: u32, count: u32, pitch: f64) -> f64 {
        (index as f64 - (count as f64 - 1.0) / 2.0) * pitch
    }
}

impl GeometryLocator for CaloWallLocator {
    fn row_z(&self, _side: u32, row: u32) -> f64 {
        Self::centred(row, self.rows, self.row_pitch)
    }

    fn block_position(&self, side: u32, column: u32, row: u32) -> Position {
        let x = if side == 0 { -self.wall_x } else { self.wall_x };
        let y = Self::centred(column, self.columns, self.column_pitch);
        Position::new(x, y, self.row_z(side, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> CaloWallLocator {
        CaloWallLocator::new(&LocatorConfig::default(), &DetectorConstants::default())
    }

    #[test]
    fn test_middle_row_is_at_zero() {
        // 13 rows: row 6 is centred
        assert!(locator().row_z(1, 6).abs() < 1e-9);
    }

    #[test]
    fn test_rows_are_pitch_apart() {
        let loc = locator();
        let pitch = LocatorConfig::default().row_pitch;
        assert!((loc.row_z(1, 7) - loc.row_z(1, 6) - pitch).abs() < 1e-9);
        assert!(loc.row_z(1, 0) < 0.0);
        assert!(loc.row_z(1, 12) > 0.0);
    }

    #[test]
    fn test_block_position_sides() {
        let loc = locator();
        let left = loc.block_position(0, 2, 6);
        let right = loc.block_position(1, 2, 6);
        assert!(left.x < 0.0);
        assert!(right.x > 0.0);
        assert!((left.y - right.y).abs() < 1e-9);
        assert!((right.z - loc.row_z(1, 6)).abs() < 1e-9);
    }
}
