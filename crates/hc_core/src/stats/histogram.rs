//! Fixed-binning histograms.
//!
//! Bins are half open: the lower edge belongs to the bin, the upper edge
//! to the next one. Samples below the range go to the underflow counter,
//! samples at or above the upper edge (and NaN) to the overflow counter.

use serde::{Deserialize, Serialize};

/// Uniform binning of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinPlacement {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Axis {
    pub fn new(bins: usize, low: f64, high: f64) -> Self {
        Self { bins, low, high }
    }

    /// `count` unit-wide bins starting at `low`.
    pub fn unit(low: f64, count: usize) -> Self {
        Self::new(count, low, low + count as f64)
    }

    pub fn is_valid(&self) -> bool {
        self.bins > 0 && self.low.is_finite() && self.high.is_finite() && self.low < self.high
    }

    pub fn bin_width(&self) -> f64 {
        (self.high - self.low) / self.bins as f64
    }

    pub fn place(&self, x: f64) -> BinPlacement {
        if x < self.low {
            return BinPlacement::Underflow;
        }
        if !(x < self.high) {
            return BinPlacement::Overflow;
        }
        let index = ((x - self.low) / self.bin_width()) as usize;
        // Rounding can push a value just under `high` into bin `bins`
        BinPlacement::Bin(index.min(self.bins - 1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    pub name: String,
    pub title: String,
    pub axis: Axis,
    pub counts: Vec<u64>,
    pub underflow: u64,
    pub overflow: u64,
    pub entries: u64,
    /// Sum of in-range samples, for the mean
    pub sum: f64,
}

impl Histogram1D {
    pub fn new(name: impl Into<String>, title: impl Into<String>, axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            axis,
            counts: vec![0; axis.bins],
            underflow: 0,
            overflow: 0,
            entries: 0,
            sum: 0.0,
        }
    }

    pub fn fill(&mut self, x: f64) {
        self.entries += 1;
        match self.axis.place(x) {
            BinPlacement::Underflow => self.underflow += 1,
            BinPlacement::Overflow => self.overflow += 1,
            BinPlacement::Bin(i) => {
                self.counts[i] += 1;
                self.sum += x;
            }
        }
    }

    /// Samples that landed inside the range.
    pub fn in_range(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        let n = self.in_range();
        (n > 0).then(|| self.sum / n as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    pub name: String,
    pub title: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    /// `counts[x][y]`
    pub counts: Vec<Vec<u64>>,
    /// Samples outside the range on either axis
    pub outside: u64,
    pub entries: u64,
}

impl Histogram2D {
    pub fn new(name: impl Into<String>, title: impl Into<String>, x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_axis,
            y_axis,
            counts: vec![vec![0; y_axis.bins]; x_axis.bins],
            outside: 0,
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        self.entries += 1;
        match (self.x_axis.place(x), self.y_axis.place(y)) {
            (BinPlacement::Bin(i), BinPlacement::Bin(j)) => self.counts[i][j] += 1,
            _ => self.outside += 1,
        }
    }

    pub fn count_at(&self, x: f64, y: f64) -> Option<u64> {
        match (self.x_axis.place(x), self.y_axis.place(y)) {
            (BinPlacement::Bin(i), BinPlacement::Bin(j)) => Some(self.counts[i][j]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_edges() {
        let axis = Axis::new(10, 0.0, 100.0);
        assert_eq!(axis.place(0.0), BinPlacement::Bin(0));
        assert_eq!(axis.place(9.999), BinPlacement::Bin(0));
        assert_eq!(axis.place(10.0), BinPlacement::Bin(1));
        assert_eq!(axis.place(100.0), BinPlacement::Overflow);
        assert_eq!(axis.place(-0.1), BinPlacement::Underflow);
        assert_eq!(axis.place(f64::NAN), BinPlacement::Overflow);
    }

    #[test]
    fn test_unit_axis() {
        let axis = Axis::unit(9.0, 7);
        assert_eq!(axis.high, 16.0);
        assert_eq!(axis.place(11.0), BinPlacement::Bin(2));
        assert!(axis.is_valid());
        assert!(!Axis::new(0, 0.0, 1.0).is_valid());
        assert!(!Axis::new(3, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_fill_1d() {
        let mut h = Histogram1D::new("e", "energy", Axis::new(150, 0.0, 1500.0));
        h.fill(80.0);
        h.fill(85.0);
        h.fill(2000.0);
        h.fill(-1.0);
        assert_eq!(h.counts[8], 2);
        assert_eq!(h.overflow, 1);
        assert_eq!(h.underflow, 1);
        assert_eq!(h.entries, 4);
        assert_eq!(h.mean(), Some(82.5));
    }

    #[test]
    fn test_fill_2d() {
        let mut h = Histogram2D::new("d", "distribution", Axis::unit(0.0, 20), Axis::unit(0.0, 14));
        h.fill(2.0, 5.0);
        h.fill(2.0, 5.0);
        h.fill(25.0, 5.0);
        assert_eq!(h.count_at(2.0, 5.0), Some(2));
        assert_eq!(h.count_at(25.0, 5.0), None);
        assert_eq!(h.outside, 1);
        assert_eq!(h.entries, 3);
    }

    proptest! {
        #[test]
        fn prop_every_fill_is_counted_once(samples in prop::collection::vec(-50.0f64..150.0, 0..100)) {
            let mut h = Histogram1D::new("x", "x", Axis::new(10, -50.0, 150.0));
            for s in &samples {
                h.fill(*s);
            }
            prop_assert_eq!(h.in_range() + h.underflow + h.overflow, samples.len() as u64);
            prop_assert_eq!(h.entries, samples.len() as u64);
        }
    }
}
