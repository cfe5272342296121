//! Region selection configuration.
//!
//! The selectors can be given as explicit rule text or derived from a
//! profile describing the commissioning zone.
//!
//! ## Environment Variables
//!
//! - `HC_SELECTION_PROFILE`: `commissioning` or `half_zone_<n>`

use super::DetectorConstants;
use serde::{Deserialize, Serialize};
use std::env;

/// Number of drift cell rows shown in the tracker occupancy maps.
pub const GEIGER_ROW_WINDOW: u32 = 7;

/// How the selector rules are derived when not given explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionProfile {
    /// One calorimeter column and the two drift cell rows facing it.
    ///
    /// Zone `n` uses calo column `n` and drift cell rows
    /// `{6n - 1; 6n}`.
    HalfZone { zone: u32 },
    /// One calorimeter column and one drift cell row, as cabled for the
    /// commissioning run.
    Commissioning { calo_column: u32, geiger_row: u32 },
}

impl SelectionProfile {
    /// First drift cell row of the zone (`6n - 3`, floored at 0).
    fn geiger_lower_limit(zone: u32) -> u32 {
        (zone * 6).saturating_sub(3)
    }

    pub fn calo_column(&self) -> u32 {
        match self {
            SelectionProfile::HalfZone { zone } => *zone,
            SelectionProfile::Commissioning { calo_column, .. } => *calo_column,
        }
    }

    /// Drift cell rows wired for readout.
    pub fn geiger_rows(&self) -> Vec<u32> {
        match self {
            SelectionProfile::HalfZone { zone } => {
                let lower = Self::geiger_lower_limit(*zone);
                vec![lower + 2, lower + 3]
            }
            SelectionProfile::Commissioning { geiger_row, .. } => vec![*geiger_row],
        }
    }

    /// Row range `[low, high)` of the tracker occupancy maps.
    pub fn geiger_row_window(&self) -> (u32, u32) {
        let low = match self {
            SelectionProfile::HalfZone { zone } => Self::geiger_lower_limit(*zone),
            SelectionProfile::Commissioning { geiger_row, .. } => geiger_row.saturating_sub(3),
        };
        (low, low + GEIGER_ROW_WINDOW)
    }

    fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name == "commissioning" {
            return Some(SelectionProfile::Commissioning {
                calo_column: 1,
                geiger_row: 4,
            });
        }
        name.strip_prefix("half_zone_")
            .and_then(|z| z.parse::<u32>().ok())
            .map(|zone| SelectionProfile::HalfZone { zone })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub profile: SelectionProfile,
    /// Explicit calorimeter rule, overrides the profile
    pub calo_rules: Option<String>,
    /// Explicit drift cell rule, overrides the profile
    pub geiger_rules: Option<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::half_zone(2)
    }
}

impl SelectionConfig {
    pub fn half_zone(zone: u32) -> Self {
        Self {
            profile: SelectionProfile::HalfZone { zone },
            calo_rules: None,
            geiger_rules: None,
        }
    }

    pub fn commissioning() -> Self {
        Self {
            profile: SelectionProfile::Commissioning {
                calo_column: 1,
                geiger_row: 4,
            },
            calo_rules: None,
            geiger_rules: None,
        }
    }

    /// Load the profile from `HC_SELECTION_PROFILE` or use the default.
    pub fn from_env_or_default() -> Self {
        env::var("HC_SELECTION_PROFILE")
            .ok()
            .and_then(|name| SelectionProfile::parse(&name))
            .map(|profile| Self {
                profile,
                ..Self::default()
            })
            .unwrap_or_default()
    }

    /// Profile by name (`commissioning`, `half_zone_<n>`).
    pub fn from_profile_name(name: &str) -> Option<Self> {
        SelectionProfile::parse(name).map(|profile| Self {
            profile,
            ..Self::default()
        })
    }

    pub fn calo_rule_text(&self, detector: &DetectorConstants) -> String {
        match &self.calo_rules {
            Some(rules) => rules.clone(),
            None => format!(
                "category='calorimeter_block' module={{{}}} side={{{}}} column={{{}}} row={{*}} part={{*}}",
                detector.module,
                detector.side,
                self.profile.calo_column()
            ),
        }
    }

    pub fn geiger_rule_text(&self, detector: &DetectorConstants) -> String {
        match &self.geiger_rules {
            Some(rules) => rules.clone(),
            None => {
                let rows: Vec<String> = self
                    .profile
                    .geiger_rows()
                    .iter()
                    .map(|r| r.to_string())
                    .collect();
                format!(
                    "category='drift_cell_core' module={{{}}} side={{{}}} layer={{*}} row={{{}}}",
                    detector.module,
                    detector.side,
                    rows.join(";")
                )
            }
        }
    }
}
