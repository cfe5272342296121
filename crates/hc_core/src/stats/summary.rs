//! Run summary written next to the histogram file.

use crate::error::{HcError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Event counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub events_read: u64,
    pub events_with_sd: u64,
    pub region_matched: u64,
    /// Region-matched events with every layer hit
    pub full_track: u64,
    pub one_calo: u64,
    pub one_calo_no_track: u64,
    pub one_calo_one_track: u64,
    pub two_calo: u64,
    pub two_calo_no_track: u64,
    pub two_calo_full_track: u64,
    pub two_calo_one_track: u64,
    pub many_calo: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramFileInfo {
    pub path: String,
    /// SHA256 of the file contents (hex)
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// RFC3339
    pub created_at: String,
    pub calo_threshold_kev: f64,
    pub counters: RunCounters,
    /// Records written per output subset
    pub subsets: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histograms: Option<HistogramFileInfo>,
}

impl RunSummary {
    pub fn new(calo_threshold_kev: f64, counters: RunCounters, subsets: BTreeMap<String, u64>) -> Self {
        Self {
            created_at: chrono::Utc::now().to_rfc3339(),
            calo_threshold_kev,
            counters,
            subsets,
            histograms: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| HcError::input(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Whether the histogram file at `path` still matches the recorded checksum.
    pub fn verify_histograms(&self, path: &Path) -> Result<bool> {
        let Some(info) = &self.histograms else {
            return Ok(false);
        };
        let bytes = fs::read(path)?;
        Ok(sha256_hex(&bytes) == info.checksum)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
