//! # Analysis Configuration
//!
//! All run parameters in one place: detector constants, region selection,
//! calorimeter threshold, locator geometry and the histogram table.
//!
//! ## Usage
//! ```rust
//! use hc_core::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::default();
//! let commissioning = AnalysisConfig::commissioning();
//! assert!(config.validate().is_ok());
//! assert!(commissioning.validate().is_ok());
//! ```

mod detector;
mod selection;

pub use detector::{DetectorConstants, LocatorConfig};
pub use selection::{SelectionConfig, SelectionProfile, GEIGER_ROW_WINDOW};

use crate::error::{HcError, Result};
use crate::geometry::Selector;
use crate::stats::HistogramCatalog;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Most tracker layers a detector description may declare.
pub const MAX_LAYERS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detector: DetectorConstants,
    pub selection: SelectionConfig,
    /// Minimum summed calorimeter energy, in keV
    pub calo_threshold_kev: f64,
    pub locator: LocatorConfig,
    /// Maximum number of records read from each input file
    pub max_events_per_file: usize,
    /// Histogram table; generated from the detector and selection when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<HistogramCatalog>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConstants::default(),
            selection: SelectionConfig::default(),
            calo_threshold_kev: 50.0,
            locator: LocatorConfig::default(),
            max_events_per_file: 10,
            histograms: None,
        }
    }
}

impl AnalysisConfig {
    /// Sort-and-analysis setup for half zone `zone`.
    pub fn half_zone(zone: u32) -> Self {
        Self {
            selection: SelectionConfig::half_zone(zone),
            ..Self::default()
        }
    }

    /// Commissioning cabling: calo column 1, drift cell row 4.
    pub fn commissioning() -> Self {
        Self {
            selection: SelectionConfig::commissioning(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file, or JSON when the extension is `.json`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HcError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let config: Self = serde_json::from_str(&text)?;
            config.validate()?;
            Ok(config)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if d.total_layers == 0 || d.total_layers > MAX_LAYERS {
            return Err(HcError::configuration(format!(
                "total_layers must be in 1..={}, got {}",
                MAX_LAYERS, d.total_layers
            )));
        }
        if d.last_layer >= d.total_layers {
            return Err(HcError::configuration(format!(
                "last_layer {} outside of {} layers",
                d.last_layer, d.total_layers
            )));
        }
        if !(d.association_half_window >= 0.0) {
            return Err(HcError::configuration(
                "association_half_window must be non-negative",
            ));
        }
        if d.calo_columns == 0 || d.calo_rows == 0 {
            return Err(HcError::configuration(
                "calorimeter wall needs at least one row and one column",
            ));
        }
        if self.selection.calo_rules.is_none()
            && self.selection.profile.calo_column() >= d.calo_columns
        {
            return Err(HcError::configuration(format!(
                "selected calorimeter column {} outside of {} columns",
                self.selection.profile.calo_column(),
                d.calo_columns
            )));
        }
        if !(self.calo_threshold_kev >= 0.0) {
            return Err(HcError::configuration(
                "calo_threshold_kev must be non-negative",
            ));
        }
        if let Some(catalog) = &self.histograms {
            catalog.validate()?;
        }
        Ok(())
    }

    /// Calorimeter and drift cell selectors built from the selection rules.
    pub fn build_selectors(&self) -> Result<(Selector, Selector)> {
        let calo = Selector::initialize(&self.selection.calo_rule_text(&self.detector))?;
        let geiger = Selector::initialize(&self.selection.geiger_rule_text(&self.detector))?;
        Ok((calo, geiger))
    }

    /// Histogram table in effect for this configuration.
    pub fn histogram_catalog(&self) -> HistogramCatalog {
        match &self.histograms {
            Some(catalog) => catalog.clone(),
            None => HistogramCatalog::standard(&self.detector, &self.selection.profile),
        }
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AnalysisConfig::default();
        assert!((cfg.calo_threshold_kev - 50.0).abs() < 1e-9);
        assert_eq!(cfg.detector.total_layers, 9);
        assert_eq!(cfg.detector.last_layer, 8);
        assert!((cfg.detector.association_half_window - 185.0).abs() < 1e-9);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "calo_threshold_kev: 80\ndetector:\n  total_layers: 7\n  last_layer: 6\n";
        let cfg = AnalysisConfig::from_yaml_str(yaml).unwrap();
        assert!((cfg.calo_threshold_kev - 80.0).abs() < 1e-9);
        assert_eq!(cfg.detector.total_layers, 7);
        assert_eq!(cfg.detector.calo_rows, 13);
        assert_eq!(cfg.selection, SelectionConfig::default());
    }

    #[test]
    fn test_yaml_profile() {
        let yaml = "selection:\n  profile:\n    kind: commissioning\n    calo_column: 1\n    geiger_row: 4\n";
        let cfg = AnalysisConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg, AnalysisConfig::commissioning());
    }

    #[test]
    fn test_invalid_constants_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.detector.last_layer = 9;
        assert!(matches!(cfg.validate(), Err(HcError::Configuration(_))));

        let mut cfg = AnalysisConfig::default();
        cfg.detector.total_layers = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.detector.total_layers = MAX_LAYERS + 1;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.calo_threshold_kev = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_selected_column_outside_wall_rejected() {
        let cfg = AnalysisConfig::half_zone(25);
        assert!(matches!(cfg.validate(), Err(HcError::Configuration(_))));
        assert!(AnalysisConfig::half_zone(19).validate().is_ok());

        let mut cfg = AnalysisConfig::commissioning();
        cfg.detector.calo_columns = 1;
        assert!(cfg.validate().is_err());

        let yaml = "selection:\n  profile:\n    kind: half_zone\n    zone: 20\n";
        assert!(AnalysisConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_bad_rule_text_fails_selector_build() {
        let mut cfg = AnalysisConfig::default();
        cfg.selection.geiger_rules = Some("category='nowhere'".to_string());
        assert!(matches!(
            cfg.build_selectors(),
            Err(HcError::Configuration(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let cfg = AnalysisConfig::half_zone(3);
        let yaml = cfg.to_yaml().unwrap();
        let parsed = AnalysisConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_json_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{"calo_threshold_kev": 120.0}"#).unwrap();
        let cfg = AnalysisConfig::from_path(&path).unwrap();
        assert!((cfg.calo_threshold_kev - 120.0).abs() < 1e-9);
    }
}
