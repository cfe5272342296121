//! Per-event classification.
//!
//! For one event: drift cell re-triggers are removed, the surviving cells
//! are matched against the tracker selector, calorimeter steps are folded
//! into per-block summaries, and the topology is derived from the counts.
//! Nothing is kept between events.

use super::topology::{Topology, TrackClass};
use crate::config::{AnalysisConfig, DetectorConstants};
use crate::error::Result;
use crate::event::{EventRecord, SimulatedData, CALO_HITS, GEIGER_HITS};
use crate::geometry::{CaloWallLocator, GeometryLocator, Position, Selector, SensorId};
use crate::hits::{aggregate, deduplicate, CaloHitSummary, CaloSummaryMap};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Everything derived from one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventClassification {
    pub event_id: u64,
    /// Whether the event carried a simulated data bank at all
    pub has_simulated_data: bool,
    pub region_matched: bool,
    /// Blocks over threshold, ordered by identifier
    pub calo_summaries: CaloSummaryMap,
    /// Selected drift cells after re-trigger removal
    pub geiger_hits: BTreeSet<SensorId>,
    pub layers_hit: BTreeSet<u32>,
    /// Stop positions of selected last-layer cells
    pub last_layer_positions: Vec<Position>,
    pub full_track: bool,
    /// Filled only for the one and two calorimeter cases with a full track
    pub track_calo_association: BTreeMap<SensorId, bool>,
    pub topology: Topology,
    pub vertex: Option<Position>,
    /// Vertex to block angles in degrees, two-calorimeter tracked events only
    pub vertex_angles: Vec<f64>,
    /// Drift cell hits dropped as re-triggers
    pub repeated_geiger_hits: usize,
}

impl EventClassification {
    /// Classification of an event without a simulated data bank.
    pub fn no_match(event_id: u64) -> Self {
        Self {
            event_id,
            has_simulated_data: false,
            region_matched: false,
            calo_summaries: CaloSummaryMap::new(),
            geiger_hits: BTreeSet::new(),
            layers_hit: BTreeSet::new(),
            last_layer_positions: Vec::new(),
            full_track: false,
            track_calo_association: BTreeMap::new(),
            topology: Topology::Empty,
            vertex: None,
            vertex_angles: Vec::new(),
            repeated_geiger_hits: 0,
        }
    }

    pub fn calo_count(&self) -> usize {
        self.calo_summaries.len()
    }

    pub fn any_associated(&self) -> bool {
        self.track_calo_association.values().any(|a| *a)
    }

    /// Lowest and highest block of a two-calorimeter event.
    pub fn calo_pair(&self) -> Option<(&CaloHitSummary, &CaloHitSummary)> {
        if self.calo_summaries.len() != 2 {
            return None;
        }
        let first = self.calo_summaries.values().next()?;
        let second = self.calo_summaries.values().next_back()?;
        Some((first, second))
    }

    /// Summed energy of all retained blocks, MeV.
    pub fn total_calo_energy(&self) -> f64 {
        self.calo_summaries.values().map(|s| s.energy).sum()
    }
}

/// Runs selection, aggregation and deduplication for single events.
pub struct EventClassifier<L = CaloWallLocator> {
    calo_selector: Selector,
    geiger_selector: Selector,
    locator: L,
    detector: DetectorConstants,
    threshold_kev: f64,
}

impl EventClassifier<CaloWallLocator> {
    /// Classifier with the selectors, threshold and locator of `config`.
    ///
    /// Fails with a configuration error when a selector rule does not parse.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let (calo_selector, geiger_selector) = config.build_selectors()?;
        Ok(Self::new(
            calo_selector,
            geiger_selector,
            CaloWallLocator::new(&config.locator, &config.detector),
            config.detector.clone(),
            config.calo_threshold_kev,
        ))
    }
}

impl<L: GeometryLocator> EventClassifier<L> {
    pub fn new(
        calo_selector: Selector,
        geiger_selector: Selector,
        locator: L,
        detector: DetectorConstants,
        threshold_kev: f64,
    ) -> Self {
        debug!(
            calo = %calo_selector.dump("calo selector"),
            geiger = %geiger_selector.dump("geiger selector"),
            threshold_kev,
            "event classifier ready"
        );
        Self {
            calo_selector,
            geiger_selector,
            locator,
            detector,
            threshold_kev,
        }
    }

    pub fn with_threshold(mut self, threshold_kev: f64) -> Self {
        self.threshold_kev = threshold_kev;
        self
    }

    pub fn with_selectors(mut self, calo_selector: Selector, geiger_selector: Selector) -> Self {
        self.calo_selector = calo_selector;
        self.geiger_selector = geiger_selector;
        self
    }

    pub fn threshold_kev(&self) -> f64 {
        self.threshold_kev
    }

    pub fn detector(&self) -> &DetectorConstants {
        &self.detector
    }

    pub fn calo_selector(&self) -> &Selector {
        &self.calo_selector
    }

    pub fn geiger_selector(&self) -> &Selector {
        &self.geiger_selector
    }

    pub fn classify(&self, event: &EventRecord) -> EventClassification {
        let Some(sd) = event.simulated_data.as_ref() else {
            trace!(event = event.id, "no simulated data bank");
            return EventClassification::no_match(event.id);
        };

        let mut classification = EventClassification::no_match(event.id);
        classification.has_simulated_data = true;
        classification.vertex = Some(sd.vertex());

        self.collect_geiger_hits(sd, &mut classification);

        classification.calo_summaries = aggregate(
            sd.step_hits(CALO_HITS),
            &self.calo_selector,
            self.threshold_kev,
        );
        classification.region_matched = !classification.calo_summaries.is_empty()
            || !classification.geiger_hits.is_empty();
        classification.full_track =
            classification.layers_hit.len() == self.detector.total_layers as usize;

        if !classification.region_matched {
            return classification;
        }

        let calo_count = classification.calo_count();
        if classification.full_track && (calo_count == 1 || calo_count == 2) {
            self.associate(&mut classification);
        }

        let track = TrackClass::from_layers(
            classification.layers_hit.len(),
            self.detector.total_layers as usize,
            classification.any_associated(),
        );
        classification.topology = match calo_count {
            0 => Topology::TrackerOnly,
            1 => Topology::OneCalo(track),
            2 => Topology::TwoCalo(track),
            n => Topology::ManyCalo(n),
        };

        if classification.topology == Topology::TwoCalo(TrackClass::AssociatedTrack) {
            classification.vertex_angles = self.vertex_angles(sd.vertex(), &classification);
        }

        debug!(
            event = event.id,
            calos = calo_count,
            cells = classification.geiger_hits.len(),
            layers = classification.layers_hit.len(),
            repeated = classification.repeated_geiger_hits,
            topology = %classification.topology,
            "event classified"
        );
        classification
    }

    fn collect_geiger_hits(&self, sd: &SimulatedData, classification: &mut EventClassification) {
        let raw = sd.step_hits(GEIGER_HITS);
        let kept = deduplicate(raw);
        classification.repeated_geiger_hits = raw.len() - kept.len();

        for hit in kept {
            if !self.geiger_selector.matches(&hit.sensor_id) {
                continue;
            }
            if let Some(layer) = hit.sensor_id.layer() {
                classification.layers_hit.insert(layer);
                if layer == self.detector.last_layer {
                    classification.last_layer_positions.push(hit.position_stop);
                }
            }
            classification.geiger_hits.insert(hit.sensor_id.clone());
        }
    }

    /// Mark every block whose row lies within the z window of a last-layer cell.
    fn associate(&self, classification: &mut EventClassification) {
        let window = self.detector.association_half_window;
        for (id, summary) in classification.calo_summaries.iter_mut() {
            let associated = match (id.side(), id.row()) {
                (Some(side), Some(row)) => {
                    let row_z = self.locator.row_z(side, row);
                    classification
                        .last_layer_positions
                        .iter()
                        .any(|p| (p.z - row_z).abs() < window)
                }
                _ => false,
            };
            summary.track_associated = associated;
            classification
                .track_calo_association
                .insert(id.clone(), associated);
        }
    }

    fn vertex_angles(&self, vertex: Position, classification: &EventClassification) -> Vec<f64> {
        classification
            .calo_summaries
            .keys()
            .filter_map(|id| {
                let block = self
                    .locator
                    .block_position(id.side()?, id.column()?, id.row()?);
                Some(vertex.angle(&block).to_degrees())
            })
            .collect()
    }
}
