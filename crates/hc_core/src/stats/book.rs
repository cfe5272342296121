//! Named histogram storage.

use super::catalog::{HistogramCatalog, HistogramKind};
use super::histogram::{Histogram1D, Histogram2D};
use crate::error::{HcError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Histogram {
    OneD(Histogram1D),
    TwoD(Histogram2D),
}

impl Histogram {
    pub fn name(&self) -> &str {
        match self {
            Histogram::OneD(h) => &h.name,
            Histogram::TwoD(h) => &h.name,
        }
    }

    pub fn entries(&self) -> u64 {
        match self {
            Histogram::OneD(h) => h.entries,
            Histogram::TwoD(h) => h.entries,
        }
    }

    fn dimension(&self) -> &'static str {
        match self {
            Histogram::OneD(_) => "1D",
            Histogram::TwoD(_) => "2D",
        }
    }
}

/// Histograms of one run, in catalog order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistogramBook {
    histograms: Vec<Histogram>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl HistogramBook {
    /// Book every histogram of `catalog`. The catalog is validated first.
    pub fn from_catalog(catalog: &HistogramCatalog) -> Result<Self> {
        catalog.validate()?;
        let histograms: Vec<Histogram> = catalog
            .specs()
            .iter()
            .map(|spec| match spec.kind {
                HistogramKind::OneD { x } => {
                    Histogram::OneD(Histogram1D::new(&spec.name, &spec.title, x))
                }
                HistogramKind::TwoD { x, y } => {
                    Histogram::TwoD(Histogram2D::new(&spec.name, &spec.title, x, y))
                }
            })
            .collect();
        let index = histograms
            .iter()
            .enumerate()
            .map(|(i, h)| (h.name().to_string(), i))
            .collect();
        Ok(Self { histograms, index })
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn histograms(&self) -> &[Histogram] {
        &self.histograms
    }

    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.index.get(name).map(|&i| &self.histograms[i])
    }

    pub fn get_1d(&self, name: &str) -> Option<&Histogram1D> {
        match self.get(name)? {
            Histogram::OneD(h) => Some(h),
            Histogram::TwoD(_) => None,
        }
    }

    pub fn get_2d(&self, name: &str) -> Option<&Histogram2D> {
        match self.get(name)? {
            Histogram::TwoD(h) => Some(h),
            Histogram::OneD(_) => None,
        }
    }

    fn lookup(&mut self, name: &str) -> Result<&mut Histogram> {
        let i = *self.index.get(name).ok_or_else(|| HcError::UnknownHistogram {
            name: name.to_string(),
        })?;
        Ok(&mut self.histograms[i])
    }

    /// Add one sample to the 1-D histogram `name`.
    pub fn fill(&mut self, name: &str, x: f64) -> Result<()> {
        match self.lookup(name)? {
            Histogram::OneD(h) => {
                h.fill(x);
                Ok(())
            }
            other => Err(HcError::WrongHistogramKind {
                name: name.to_string(),
                expected: "1D",
                found: other.dimension(),
            }),
        }
    }

    /// Add one sample to the 2-D histogram `name`.
    pub fn fill2d(&mut self, name: &str, x: f64, y: f64) -> Result<()> {
        match self.lookup(name)? {
            Histogram::TwoD(h) => {
                h.fill(x, y);
                Ok(())
            }
            other => Err(HcError::WrongHistogramKind {
                name: name.to_string(),
                expected: "2D",
                found: other.dimension(),
            }),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
