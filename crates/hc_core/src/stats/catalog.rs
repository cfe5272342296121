//! Histogram declarations.
//!
//! Every distribution of a run is declared once, by name, in a
//! [`HistogramCatalog`]. The catalog can be written in the run configuration;
//! otherwise the standard table below is generated from the detector
//! constants and the selection profile.

use super::histogram::Axis;
use crate::config::{DetectorConstants, SelectionProfile};
use crate::error::{HcError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Energy spectra of single blocks, keV.
const BLOCK_ENERGY: Axis = Axis { bins: 150, low: 0.0, high: 1500.0 };
/// Energy spectra of summed blocks, keV.
const SUMMED_ENERGY: Axis = Axis { bins: 300, low: 0.0, high: 3000.0 };
/// Calorimeter start times, ns.
const CALO_TIME: Axis = Axis { bins: 150, low: 0.0, high: 15.0 };
/// Time between two blocks, ns.
const DELTA_TIME: Axis = Axis { bins: 100, low: 0.0, high: 15.0 };
/// Vertex to block angle, degrees.
const ANGLE: Axis = Axis { bins: 90, low: 0.0, high: 90.0 };
/// Interaction point x (mm) relative to the wall face.
const INTERACTION_X: Axis = Axis { bins: 10, low: -50.0, high: 150.0 };
/// Interaction point z (mm).
const INTERACTION_Z: Axis = Axis { bins: 90, low: -1500.0, high: 1500.0 };
/// Drift cell rows per layer counted in the cell multiplicity.
const CELLS_PER_LAYER: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistogramKind {
    OneD { x: Axis },
    TwoD { x: Axis, y: Axis },
}

impl HistogramKind {
    pub fn dimension(&self) -> &'static str {
        match self {
            HistogramKind::OneD { .. } => "1D",
            HistogramKind::TwoD { .. } => "2D",
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            HistogramKind::OneD { x } => x.is_valid(),
            HistogramKind::TwoD { x, y } => x.is_valid() && y.is_valid(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSpec {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub kind: HistogramKind,
}

/// Ordered histogram table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistogramCatalog {
    specs: Vec<HistogramSpec>,
}

impl HistogramCatalog {
    pub fn new(specs: Vec<HistogramSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[HistogramSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&HistogramSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn one_d(&mut self, name: impl Into<String>, title: impl Into<String>, x: Axis) -> &mut Self {
        self.specs.push(HistogramSpec {
            name: name.into(),
            title: title.into(),
            kind: HistogramKind::OneD { x },
        });
        self
    }

    pub fn two_d(
        &mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        x: Axis,
        y: Axis,
    ) -> &mut Self {
        self.specs.push(HistogramSpec {
            name: name.into(),
            title: title.into(),
            kind: HistogramKind::TwoD { x, y },
        });
        self
    }

    /// Names must be non-empty and unique, every axis must have bins and a
    /// non-empty finite range.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.specs.len());
        for spec in &self.specs {
            if spec.name.trim().is_empty() {
                return Err(HcError::configuration("histogram with an empty name"));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(HcError::configuration(format!(
                    "histogram '{}' declared twice",
                    spec.name
                )));
            }
            if !spec.kind.is_valid() {
                return Err(HcError::configuration(format!(
                    "histogram '{}' has an invalid binning",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Check that every histogram of `required` is declared here with the
    /// same dimension. Binning and titles may differ.
    pub fn check_covers(&self, required: &HistogramCatalog) -> Result<()> {
        for wanted in &required.specs {
            let found = self.get(&wanted.name).ok_or_else(|| HcError::UnknownHistogram {
                name: wanted.name.clone(),
            })?;
            if found.kind.dimension() != wanted.kind.dimension() {
                return Err(HcError::WrongHistogramKind {
                    name: wanted.name.clone(),
                    expected: wanted.kind.dimension(),
                    found: found.kind.dimension(),
                });
            }
        }
        Ok(())
    }

    /// Name of the per-column energy spectrum of calorimeter column `column`.
    pub fn column_energy_name(column: u32) -> String {
        format!("calo_column_{}_energy", column)
    }

    /// Standard table of the sort-and-analysis run.
    pub fn standard(detector: &DetectorConstants, profile: &SelectionProfile) -> Self {
        let label = match profile {
            SelectionProfile::HalfZone { zone } => format!("zone {}", zone),
            SelectionProfile::Commissioning { calo_column, .. } => {
                format!("commissioning column {}", calo_column)
            }
        };
        let columns = Axis::unit(0.0, detector.calo_columns as usize);
        let rows = Axis::unit(0.0, detector.calo_rows as usize + 1);
        let (row_low, row_high) = profile.geiger_row_window();
        let cell_rows = Axis::unit(row_low as f64, (row_high - row_low) as usize);
        let layers = Axis::unit(0.0, detector.total_layers as usize + 1);

        let mut c = Self::default();
        c.one_d(
            "calo_number",
            format!("Number of calorimeters touched, {}", label),
            Axis::unit(0.0, detector.calo_rows as usize),
        )
        .one_d(
            "geiger_number",
            format!("Number of Geiger cells touched, {}", label),
            Axis::unit(0.0, (detector.total_layers * CELLS_PER_LAYER) as usize),
        )
        .one_d(
            "calo_total_energy",
            format!("Calo total energy spectrum, {}", label),
            SUMMED_ENERGY,
        )
        .one_d(
            "calo_total_time",
            format!("Time start for a calo, {}", label),
            CALO_TIME,
        )
        .two_d(
            "calo_total_distribution",
            format!("Calo total distribution, {}", label),
            columns,
            rows,
        )
        .two_d(
            "geiger_total_distribution",
            format!("Geiger total distribution, {}", label),
            cell_rows,
            layers,
        );

        c.one_d("one_calo_energy", format!("One calo energy, {}", label), BLOCK_ENERGY)
            .two_d(
                "one_calo_distribution",
                format!("One calo distribution, {}", label),
                columns,
                rows,
            )
            .one_d(
                "one_calo_no_track_energy",
                format!("One calo no track energy, {}", label),
                BLOCK_ENERGY,
            )
            .two_d(
                "one_calo_no_track_distribution",
                format!("One calo no track, {}", label),
                columns,
                rows,
            )
            .one_d(
                "one_calo_one_track_energy",
                format!("One calo one track energy, {}", label),
                BLOCK_ENERGY,
            )
            .two_d(
                "one_calo_one_track_distribution",
                format!("One calo one track, {}", label),
                columns,
                rows,
            )
            .two_d(
                "one_calo_one_track_geiger_distribution",
                format!("One calo one track geiger distribution, {}", label),
                cell_rows,
                layers,
            );

        for (prefix, what) in [
            ("two_calo", "Two calos"),
            ("two_calo_no_track", "Two calos no track"),
            ("two_calo_one_track", "Two calos one track"),
        ] {
            c.one_d(
                format!("{}_energy_min", prefix),
                format!("{} energy min spectrum, {}", what, label),
                BLOCK_ENERGY,
            )
            .one_d(
                format!("{}_energy_max", prefix),
                format!("{} energy max spectrum, {}", what, label),
                BLOCK_ENERGY,
            )
            .one_d(
                format!("{}_total_energy", prefix),
                format!("{} total energy spectrum, {}", what, label),
                SUMMED_ENERGY,
            )
            .one_d(
                format!("{}_delta_time", prefix),
                format!("{} delta time (ns), {}", what, label),
                DELTA_TIME,
            )
            .two_d(
                format!("{}_distribution", prefix),
                format!("{} distribution, {}", what, label),
                columns,
                rows,
            );
        }
        c.two_d(
            "two_calo_geiger_distribution",
            format!("Two calos geiger distribution, {}", label),
            cell_rows,
            layers,
        )
        .one_d(
            "two_calo_one_track_electron_energy",
            format!("Two calos one track electron energy spectrum, {}", label),
            BLOCK_ENERGY,
        )
        .one_d(
            "two_calo_one_track_gamma_energy",
            format!("Two calos one track gamma energy spectrum, {}", label),
            BLOCK_ENERGY,
        )
        .one_d(
            "two_calo_one_track_angle",
            format!("Angle (degrees) between the vertex and the calorimeters hit, {}", label),
            ANGLE,
        )
        .two_d(
            "two_calo_one_track_calo_interaction_distribution",
            format!("Two calos one track calo interaction distribution, {}", label),
            INTERACTION_X,
            INTERACTION_Z,
        )
        .two_d(
            "two_calo_one_track_geiger_distribution",
            format!("Two calos one track geiger distribution, {}", label),
            cell_rows,
            layers,
        )
        .two_d(
            "calo_distribution_full_track",
            format!("Calo full track distribution, {}", label),
            columns,
            rows,
        );

        c.one_d(
            "event_total_energy",
            format!("Event total calorimeter energy, {}", label),
            SUMMED_ENERGY,
        );
        for column in 0..detector.calo_columns {
            c.one_d(
                Self::column_energy_name(column),
                format!("Calo column {} energy, {}", column, label),
                BLOCK_ENERGY,
            );
        }
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> HistogramCatalog {
        HistogramCatalog::standard(
            &DetectorConstants::default(),
            &SelectionProfile::HalfZone { zone: 2 },
        )
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = standard();
        assert!(catalog.validate().is_ok());
        assert!(catalog.get("two_calo_one_track_angle").is_some());
        assert!(catalog.get("calo_column_19_energy").is_some());
        assert!(catalog.get("calo_column_20_energy").is_none());
    }

    #[test]
    fn test_standard_binnings() {
        let catalog = standard();
        assert_eq!(
            catalog.get("calo_number").unwrap().kind,
            HistogramKind::OneD { x: Axis::new(13, 0.0, 13.0) }
        );
        assert_eq!(
            catalog.get("geiger_number").unwrap().kind,
            HistogramKind::OneD { x: Axis::new(54, 0.0, 54.0) }
        );
        assert_eq!(
            catalog.get("geiger_total_distribution").unwrap().kind,
            HistogramKind::TwoD {
                x: Axis::new(7, 9.0, 16.0),
                y: Axis::new(10, 0.0, 10.0),
            }
        );
        assert_eq!(
            catalog.get("calo_total_distribution").unwrap().kind,
            HistogramKind::TwoD {
                x: Axis::new(20, 0.0, 20.0),
                y: Axis::new(14, 0.0, 14.0),
            }
        );
        assert!(catalog
            .get("one_calo_energy")
            .unwrap()
            .title
            .ends_with("zone 2"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut catalog = HistogramCatalog::default();
        catalog
            .one_d("a", "", Axis::new(1, 0.0, 1.0))
            .one_d("a", "", Axis::new(2, 0.0, 1.0));
        assert!(matches!(catalog.validate(), Err(HcError::Configuration(_))));
    }

    #[test]
    fn test_invalid_axis_rejected() {
        let mut catalog = HistogramCatalog::default();
        catalog.one_d("a", "", Axis::new(10, 5.0, 5.0));
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_check_covers() {
        let mut required = HistogramCatalog::default();
        required.one_d("a", "", Axis::new(1, 0.0, 1.0));

        let mut rebinned = HistogramCatalog::default();
        rebinned.one_d("a", "A", Axis::new(50, 0.0, 100.0));
        assert!(rebinned.check_covers(&required).is_ok());

        let mut flat = HistogramCatalog::default();
        flat.two_d("a", "", Axis::new(1, 0.0, 1.0), Axis::new(1, 0.0, 1.0));
        assert!(matches!(
            flat.check_covers(&required),
            Err(HcError::WrongHistogramKind { .. })
        ));
        assert!(matches!(
            HistogramCatalog::default().check_covers(&required),
            Err(HcError::UnknownHistogram { .. })
        ));
    }

    #[test]
    fn test_yaml_table() {
        let yaml = "- name: calo_number\n  kind:\n    kind: one_d\n    x: {bins: 5, low: 0.0, high: 5.0}\n";
        let catalog: HistogramCatalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.specs()[0].title, "");
        assert!(catalog.validate().is_ok());
    }
}
