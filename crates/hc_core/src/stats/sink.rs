//! Statistics sink.
//!
//! Accumulates classified events into counters and histograms and forwards
//! the raw record to every output subset whose predicate holds. The sink is
//! the only state that lives across events.

use super::book::HistogramBook;
use super::catalog::HistogramCatalog;
use super::summary::{sha256_hex, HistogramFileInfo, RunCounters, RunSummary};
use crate::analysis::{EventClassification, Topology, TrackClass};
use crate::config::AnalysisConfig;
use crate::error::{HcError, Result};
use crate::event::{EventRecord, EventWriter};
use crate::hits::CaloHitSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Filtered event outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSubset {
    /// Any selected calorimeter or drift cell
    MatchRules,
    /// At least one selected drift cell
    MatchRulesWithGeiger,
    /// At least one calorimeter and every layer hit
    FullTrack,
    /// Exactly two calorimeters and every layer hit
    TwoCalosOneFullTrack,
}

impl OutputSubset {
    pub const ALL: [OutputSubset; 4] = [
        OutputSubset::MatchRules,
        OutputSubset::MatchRulesWithGeiger,
        OutputSubset::FullTrack,
        OutputSubset::TwoCalosOneFullTrack,
    ];

    /// File name stem of the subset.
    pub fn name(&self) -> &'static str {
        match self {
            OutputSubset::MatchRules => "match_rules",
            OutputSubset::MatchRulesWithGeiger => "match_rules_with_geiger",
            OutputSubset::FullTrack => "match_rules_full_track",
            OutputSubset::TwoCalosOneFullTrack => "match_rules_two_calos_one_full_track",
        }
    }

    pub fn accepts(&self, c: &EventClassification) -> bool {
        if !c.region_matched {
            return false;
        }
        match self {
            OutputSubset::MatchRules => true,
            OutputSubset::MatchRulesWithGeiger => !c.geiger_hits.is_empty(),
            OutputSubset::FullTrack => c.calo_count() >= 1 && c.full_track,
            OutputSubset::TwoCalosOneFullTrack => c.calo_count() == 2 && c.full_track,
        }
    }
}

fn kev(mev: f64) -> f64 {
    mev * 1000.0
}

pub struct StatisticsSink {
    calo_threshold_kev: f64,
    counters: RunCounters,
    book: Option<HistogramBook>,
    subsets: Vec<(OutputSubset, EventWriter)>,
}

impl StatisticsSink {
    /// Counters and subsets only, no histograms.
    pub fn counting(calo_threshold_kev: f64) -> Self {
        Self {
            calo_threshold_kev,
            counters: RunCounters::default(),
            book: None,
            subsets: Vec::new(),
        }
    }

    /// Sink with the histogram table of `config`.
    ///
    /// A configured table may rebin or retitle the standard histograms but
    /// must declare all of them.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let catalog = config.histogram_catalog();
        if config.histograms.is_some() {
            let standard =
                HistogramCatalog::standard(&config.detector, &config.selection.profile);
            catalog.check_covers(&standard)?;
        }
        let book = HistogramBook::from_catalog(&catalog)?;
        debug!(histograms = book.len(), "histogram book ready");
        Ok(Self {
            book: Some(book),
            ..Self::counting(config.calo_threshold_kev)
        })
    }

    /// Route `subset` records to `writer`. One writer per subset.
    pub fn attach(&mut self, subset: OutputSubset, writer: EventWriter) -> Result<()> {
        if self.subsets.iter().any(|(s, _)| *s == subset) {
            return Err(HcError::configuration(format!(
                "output subset '{}' attached twice",
                subset.name()
            )));
        }
        info!(subset = subset.name(), path = %writer.path().display(), "output subset attached");
        self.subsets.push((subset, writer));
        Ok(())
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn book(&self) -> Option<&HistogramBook> {
        self.book.as_ref()
    }

    pub fn record(&mut self, c: &EventClassification, event: &EventRecord) -> Result<()> {
        self.counters.events_read += 1;
        if c.has_simulated_data {
            self.counters.events_with_sd += 1;
        }
        if !c.region_matched {
            return Ok(());
        }

        for (subset, writer) in self.subsets.iter_mut() {
            if subset.accepts(c) {
                writer.write(event)?;
            }
        }

        self.count(c);
        if let Some(book) = self.book.as_mut() {
            fill_histograms(book, c)?;
        }
        Ok(())
    }

    fn count(&mut self, c: &EventClassification) {
        let n = &mut self.counters;
        n.region_matched += 1;
        if c.full_track {
            n.full_track += 1;
        }
        match c.topology {
            Topology::OneCalo(track) => {
                n.one_calo += 1;
                match track {
                    TrackClass::NoTrack => n.one_calo_no_track += 1,
                    TrackClass::AssociatedTrack => n.one_calo_one_track += 1,
                    _ => {}
                }
            }
            Topology::TwoCalo(track) => {
                n.two_calo += 1;
                if track == TrackClass::NoTrack {
                    n.two_calo_no_track += 1;
                }
                if track.is_full_track() {
                    n.two_calo_full_track += 1;
                }
                if track == TrackClass::AssociatedTrack {
                    n.two_calo_one_track += 1;
                }
            }
            Topology::ManyCalo(_) => n.many_calo += 1,
            Topology::Empty | Topology::TrackerOnly => {}
        }
    }

    fn subset_counts(&self) -> BTreeMap<String, u64> {
        self.subsets
            .iter()
            .map(|(s, w)| (s.name().to_string(), w.count()))
            .collect()
    }

    /// Snapshot of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(self.calo_threshold_kev, self.counters, self.subset_counts())
    }

    /// Close every subset and, when `histogram_path` is given, write the
    /// histograms there as JSON. The summary records the file checksum.
    pub fn finish(self, histogram_path: Option<&Path>) -> Result<RunSummary> {
        let histograms = match (histogram_path, self.book.as_ref()) {
            (Some(path), Some(book)) => {
                let json = book.to_json()?;
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                fs::write(path, &json)?;
                Some(HistogramFileInfo {
                    path: path.display().to_string(),
                    checksum: sha256_hex(json.as_bytes()),
                })
            }
            _ => None,
        };

        let mut subsets = BTreeMap::new();
        for (subset, writer) in self.subsets {
            subsets.insert(subset.name().to_string(), writer.finish()?);
        }

        let mut summary = RunSummary::new(self.calo_threshold_kev, self.counters, subsets);
        summary.histograms = histograms;
        info!(
            events = summary.counters.events_read,
            matched = summary.counters.region_matched,
            "statistics sink closed"
        );
        Ok(summary)
    }
}

fn fill_blocks<'a>(
    book: &mut HistogramBook,
    name: &str,
    blocks: impl IntoIterator<Item = &'a CaloHitSummary>,
) -> Result<()> {
    for block in blocks {
        if let (Some(column), Some(row)) = (block.sensor_id.column(), block.sensor_id.row()) {
            book.fill2d(name, column as f64, row as f64)?;
        }
    }
    Ok(())
}

fn fill_cells(book: &mut HistogramBook, name: &str, c: &EventClassification) -> Result<()> {
    for cell in &c.geiger_hits {
        if let (Some(layer), Some(row)) = (cell.layer(), cell.row()) {
            book.fill2d(name, row as f64, layer as f64)?;
        }
    }
    Ok(())
}

fn fill_histograms(book: &mut HistogramBook, c: &EventClassification) -> Result<()> {
    let blocks = c.calo_summaries.values();

    book.fill("calo_number", c.calo_count() as f64)?;
    book.fill("geiger_number", c.geiger_hits.len() as f64)?;
    for block in blocks.clone() {
        book.fill("calo_total_energy", block.energy_kev())?;
        book.fill("calo_total_time", block.time)?;
        if let Some(column) = block.sensor_id.column() {
            let name = HistogramCatalog::column_energy_name(column);
            if book.get(&name).is_some() {
                book.fill(&name, block.energy_kev())?;
            } else {
                warn!(event = c.event_id, block = %block.sensor_id, "no energy spectrum for column");
            }
        }
    }
    fill_blocks(book, "calo_total_distribution", blocks.clone())?;
    fill_cells(book, "geiger_total_distribution", c)?;
    book.fill("event_total_energy", kev(c.total_calo_energy()))?;

    if c.calo_count() > 0 && c.full_track {
        fill_blocks(book, "calo_distribution_full_track", blocks.clone())?;
    }

    match c.topology {
        Topology::OneCalo(track) => {
            let energy = kev(c.total_calo_energy());
            book.fill("one_calo_energy", energy)?;
            fill_blocks(book, "one_calo_distribution", blocks.clone())?;
            match track {
                TrackClass::NoTrack => {
                    book.fill("one_calo_no_track_energy", energy)?;
                    fill_blocks(book, "one_calo_no_track_distribution", blocks)?;
                }
                TrackClass::AssociatedTrack => {
                    book.fill("one_calo_one_track_energy", energy)?;
                    fill_blocks(book, "one_calo_one_track_distribution", blocks)?;
                    fill_cells(book, "one_calo_one_track_geiger_distribution", c)?;
                }
                _ => {}
            }
        }
        Topology::TwoCalo(track) => {
            if let Some((first, second)) = c.calo_pair() {
                fill_two_calo(book, c, track, first, second)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn fill_two_calo(
    book: &mut HistogramBook,
    c: &EventClassification,
    track: TrackClass,
    first: &CaloHitSummary,
    second: &CaloHitSummary,
) -> Result<()> {
    let delta_time = (first.time - second.time).abs();
    let min = first.energy.min(second.energy);
    let max = first.energy.max(second.energy);

    let mut families = vec!["two_calo"];
    match track {
        TrackClass::NoTrack => families.push("two_calo_no_track"),
        TrackClass::AssociatedTrack => families.push("two_calo_one_track"),
        _ => {}
    }
    for prefix in families {
        book.fill(&format!("{}_energy_min", prefix), kev(min))?;
        book.fill(&format!("{}_energy_max", prefix), kev(max))?;
        book.fill(&format!("{}_total_energy", prefix), kev(min + max))?;
        book.fill(&format!("{}_delta_time", prefix), delta_time)?;
        fill_blocks(book, &format!("{}_distribution", prefix), [first, second])?;
    }
    fill_cells(book, "two_calo_geiger_distribution", c)?;

    if track != TrackClass::AssociatedTrack {
        return Ok(());
    }
    for block in [first, second] {
        if block.track_associated {
            book.fill("two_calo_one_track_electron_energy", block.energy_kev())?;
            book.fill2d(
                "two_calo_one_track_calo_interaction_distribution",
                block.left_most_position.x,
                block.left_most_position.z,
            )?;
        } else {
            book.fill("two_calo_one_track_gamma_energy", block.energy_kev())?;
        }
    }
    fill_cells(book, "two_calo_one_track_geiger_distribution", c)?;
    for angle in &c.vertex_angles {
        book.fill("two_calo_one_track_angle", *angle)?;
    }
    Ok(())
}
