//! Half-Commissioning Programs
//!
//! Batch runs over simulated event containers:
//! - `sort`: keep the events that touch the selected region
//! - `analyze`: sort, classify and fill the run histograms

use anyhow::{bail, Context, Result};
use hc_core::config::AnalysisConfig;
use hc_core::event::ContainerFormat;
use hc_core::geometry::GeometryLocator;
use hc_core::stats::{OutputSubset, RunSummary, StatisticsSink};
use hc_core::{
    EventClassifier, EventReader, EventWriter, HcError, ReaderLimits, SelectionConfig, Selector,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Subdirectory of the region-matched events.
pub const SORTED_DIR: &str = "sorted_raw_data";
/// Subdirectory of the histograms and run summary.
pub const ANALYSIS_DIR: &str = "analysis";
/// Subdirectory of the topology subsets, under [`ANALYSIS_DIR`].
pub const OTHER_EVENTS_DIR: &str = "other_event_files";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `info`, or `debug` when `debug`
/// is set.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore error if subscriber was already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Effective configuration: the file at `path` (or the defaults with the
/// `HC_SELECTION_PROFILE` environment profile), then the `profile` override.
pub fn load_config(path: Option<&Path>, profile: Option<&str>) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(path) => AnalysisConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AnalysisConfig {
            selection: SelectionConfig::from_env_or_default(),
            ..AnalysisConfig::default()
        },
    };
    if let Some(name) = profile {
        let Some(selection) = SelectionConfig::from_profile_name(name) else {
            bail!("Unknown selection profile '{}' (commissioning, half_zone_<n>)", name);
        };
        config.selection = selection;
    }
    Ok(config)
}

/// Whether `err` stopped the run before any event was processed: bad
/// configuration, bad selector rules or unusable inputs.
pub fn is_startup_error(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<HcError>())
        .any(HcError::is_fatal)
}

/// Inputs and output location shared by both programs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Overrides `max_events_per_file` of the configuration
    pub max_events_per_file: Option<usize>,
}

impl RunOptions {
    pub fn new(inputs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output_dir: output_dir.into(),
            max_events_per_file: None,
        }
    }

    fn open_reader(&self, config: &AnalysisConfig) -> Result<EventReader> {
        let per_file = self
            .max_events_per_file
            .unwrap_or(config.max_events_per_file);
        let limits = ReaderLimits::per_file(per_file, self.inputs.len());
        Ok(EventReader::open(&self.inputs, limits)?)
    }

    /// Container format of the outputs, taken from the first input.
    fn output_format(&self) -> Result<ContainerFormat> {
        match self.inputs.first() {
            Some(first) => Ok(ContainerFormat::from_path(first)?),
            None => bail!("No input file(s)"),
        }
    }

    /// First input's file name without directory and extension.
    fn stem(&self) -> String {
        self.inputs
            .first()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string())
    }
}

/// Selector rule files replacing the configured selectors.
#[derive(Debug, Clone, Default)]
pub struct RuleFiles {
    pub calo: Option<PathBuf>,
    pub tracker: Option<PathBuf>,
}

/// Files written by an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub summary: RunSummary,
    pub histogram_path: PathBuf,
    pub summary_path: PathBuf,
}

fn create_writer(sink: &mut StatisticsSink, subset: OutputSubset, path: PathBuf) -> Result<()> {
    let writer = EventWriter::create(&path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    sink.attach(subset, writer)?;
    Ok(())
}

fn process<L: GeometryLocator>(
    classifier: &EventClassifier<L>,
    mut reader: EventReader,
    sink: &mut StatisticsSink,
) -> Result<()> {
    for record in reader.by_ref() {
        let event = record?;
        let classification = classifier.classify(&event);
        sink.record(&classification, &event)?;
    }
    debug!(records = reader.records_read(), "input exhausted");
    Ok(())
}

/// Keep the events touching the selected region, without threshold.
///
/// Writes `match_rules.<ext>` and `match_rules_with_geiger.<ext>` in the
/// output directory.
pub fn sort(config: &AnalysisConfig, options: &RunOptions) -> Result<RunSummary> {
    config.validate()?;
    let reader = options.open_reader(config)?;
    let ext = options.output_format()?.extension();
    let classifier = EventClassifier::from_config(config)?.with_threshold(0.0);

    let mut sink = StatisticsSink::counting(0.0);
    for subset in [OutputSubset::MatchRules, OutputSubset::MatchRulesWithGeiger] {
        let path = options
            .output_dir
            .join(format!("{}.{}", subset.name(), ext));
        create_writer(&mut sink, subset, path)?;
    }

    info!(inputs = options.inputs.len(), "sorting events");
    process(&classifier, reader, &mut sink)?;
    let summary = sink.finish(None)?;
    info!(
        read = summary.counters.events_read,
        matched = summary.counters.region_matched,
        "sort done"
    );
    Ok(summary)
}

/// Sort, classify and fill the run histograms.
///
/// Layout under the output directory:
///
/// ```text
/// sorted_raw_data/<stem>_match_rules.<ext>
/// analysis/<stem>_histograms.json
/// analysis/<stem>_summary.json
/// analysis/other_event_files/<stem>_match_rules_full_track.<ext>
/// analysis/other_event_files/<stem>_match_rules_two_calos_one_full_track.<ext>
/// ```
pub fn analyze(
    config: &AnalysisConfig,
    options: &RunOptions,
    rules: &RuleFiles,
) -> Result<AnalysisOutputs> {
    config.validate()?;
    let reader = options.open_reader(config)?;
    let ext = options.output_format()?.extension();

    let (mut calo_selector, mut geiger_selector) = config.build_selectors()?;
    if let Some(path) = &rules.calo {
        calo_selector = Selector::from_rules_file(path)?;
    }
    if let Some(path) = &rules.tracker {
        geiger_selector = Selector::from_rules_file(path)?;
    }
    let classifier =
        EventClassifier::from_config(config)?.with_selectors(calo_selector, geiger_selector);

    let sorted_dir = options.output_dir.join(SORTED_DIR);
    let analysis_dir = options.output_dir.join(ANALYSIS_DIR);
    let other_dir = analysis_dir.join(OTHER_EVENTS_DIR);
    for dir in [&sorted_dir, &analysis_dir, &other_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    debug!(output = %options.output_dir.display(), "output directories ready");

    let stem = options.stem();
    let mut sink = StatisticsSink::from_config(config)?;
    create_writer(
        &mut sink,
        OutputSubset::MatchRules,
        sorted_dir.join(format!("{}_{}.{}", stem, OutputSubset::MatchRules.name(), ext)),
    )?;
    for subset in [OutputSubset::FullTrack, OutputSubset::TwoCalosOneFullTrack] {
        let path = other_dir.join(format!("{}_{}.{}", stem, subset.name(), ext));
        create_writer(&mut sink, subset, path)?;
    }

    info!(
        inputs = options.inputs.len(),
        threshold_kev = classifier.threshold_kev(),
        "analysing events"
    );
    process(&classifier, reader, &mut sink)?;

    let histogram_path = analysis_dir.join(format!("{}_histograms.json", stem));
    let summary_path = analysis_dir.join(format!("{}_summary.json", stem));
    let summary = sink.finish(Some(&histogram_path))?;
    summary.write_json(&summary_path)?;
    info!(
        read = summary.counters.events_read,
        matched = summary.counters.region_matched,
        full_track = summary.counters.full_track,
        "analysis done"
    );

    Ok(AnalysisOutputs {
        summary,
        histogram_path,
        summary_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_core::event::{CALO_HITS, GEIGER_HITS};
    use hc_core::{EventRecord, Position, RawHit, SensorId, SimulatedData};
    use std::path::Path;

    /// One calorimeter in column 2, row 5 with a full track ending at its row.
    fn tracked_event(id: u64) -> EventRecord {
        let mut sd = SimulatedData::new(Position::new(0.0, 0.0, 0.0));
        sd.add_step_hit(
            CALO_HITS,
            RawHit::new(SensorId::calo(0, 1, 2, 5, 0), 0.4, 2.0)
                .with_positions(Position::new(4360.0, 0.0, -250.0), Position::zeros()),
        );
        for layer in 0..9 {
            sd.add_step_hit(
                GEIGER_HITS,
                RawHit::new(SensorId::geiger(0, 1, layer, 11), 0.0, 1.0)
                    .with_positions(Position::zeros(), Position::new(0.0, 0.0, -259.0)),
            );
        }
        EventRecord::new(id, sd)
    }

    /// Calorimeter outside the selected column only.
    fn outside_event(id: u64) -> EventRecord {
        let mut sd = SimulatedData::new(Position::zeros());
        sd.add_step_hit(CALO_HITS, RawHit::new(SensorId::calo(0, 1, 7, 5, 0), 0.4, 2.0));
        EventRecord::new(id, sd)
    }

    /// Sub-threshold calorimeter hit with a single drift cell.
    fn weak_event(id: u64) -> EventRecord {
        let mut sd = SimulatedData::new(Position::zeros());
        sd.add_step_hit(CALO_HITS, RawHit::new(SensorId::calo(0, 1, 2, 3, 0), 0.01, 2.0));
        EventRecord::new(id, sd)
    }

    fn write_input(path: &Path, records: &[EventRecord]) {
        let mut writer = EventWriter::create(path).unwrap();
        for record in records {
            writer.write(record).unwrap();
        }
        writer.finish().unwrap();
    }

    fn sample_input(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        write_input(
            &path,
            &[
                tracked_event(0),
                EventRecord::empty(1),
                outside_event(2),
                weak_event(3),
            ],
        );
        path
    }

    fn count_records(path: &Path) -> usize {
        EventReader::open(&[path.to_path_buf()], ReaderLimits::default())
            .unwrap()
            .count()
    }

    #[test]
    fn test_analyze_layout_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_input(dir.path(), "run_42.jsonl");
        let out = dir.path().join("out");

        let outputs = analyze(
            &AnalysisConfig::default(),
            &RunOptions::new(vec![input], &out),
            &RuleFiles::default(),
        )
        .unwrap();

        let n = outputs.summary.counters;
        assert_eq!(n.events_read, 4);
        assert_eq!(n.events_with_sd, 3);
        assert_eq!(n.region_matched, 1);
        assert_eq!(n.one_calo_one_track, 1);

        assert!(out.join("analysis/other_event_files").is_dir());
        assert_eq!(count_records(&out.join("sorted_raw_data/run_42_match_rules.jsonl")), 1);
        assert_eq!(
            count_records(&out.join("analysis/other_event_files/run_42_match_rules_full_track.jsonl")),
            1
        );
        assert_eq!(
            count_records(&out.join(
                "analysis/other_event_files/run_42_match_rules_two_calos_one_full_track.jsonl"
            )),
            0
        );

        assert_eq!(outputs.summary_path, out.join("analysis/run_42_summary.json"));
        let loaded = RunSummary::from_json_file(&outputs.summary_path).unwrap();
        assert!(loaded.verify_histograms(&outputs.histogram_path).unwrap());
    }

    #[test]
    fn test_sort_zero_threshold_keeps_weak_event() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_input(dir.path(), "run.hcz");
        let out = dir.path().join("sorted");

        let summary = sort(&AnalysisConfig::default(), &RunOptions::new(vec![input], &out)).unwrap();
        assert_eq!(summary.counters.region_matched, 2);
        assert_eq!(count_records(&out.join("match_rules.hcz")), 2);
        assert_eq!(count_records(&out.join("match_rules_with_geiger.hcz")), 1);
    }

    #[test]
    fn test_event_limit_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_input(dir.path(), "run.jsonl");
        let mut options = RunOptions::new(vec![input], dir.path().join("out"));
        options.max_events_per_file = Some(2);

        let summary = sort(&AnalysisConfig::default(), &options).unwrap();
        assert_eq!(summary.counters.events_read, 2);
    }

    #[test]
    fn test_empty_rules_file_matches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_input(dir.path(), "run.jsonl");
        let empty = dir.path().join("calo.rules");
        fs::write(&empty, "# no rule\n").unwrap();
        let tracker = dir.path().join("tracker.rules");
        fs::write(&tracker, "").unwrap();

        let outputs = analyze(
            &AnalysisConfig::default(),
            &RunOptions::new(vec![input], dir.path().join("out")),
            &RuleFiles {
                calo: Some(empty),
                tracker: Some(tracker),
            },
        )
        .unwrap();
        assert_eq!(outputs.summary.counters.events_read, 4);
        assert_eq!(outputs.summary.counters.region_matched, 0);
    }

    #[test]
    fn test_missing_input_reported_before_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let result = analyze(
            &AnalysisConfig::default(),
            &RunOptions::new(vec![dir.path().join("missing.jsonl")], &out),
            &RuleFiles::default(),
        );
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_column_outside_wall_fails_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_input(dir.path(), "run.jsonl");
        let out = dir.path().join("out");
        let err = analyze(
            &AnalysisConfig::half_zone(25),
            &RunOptions::new(vec![input], &out),
            &RuleFiles::default(),
        )
        .unwrap_err();
        assert!(is_startup_error(&err));
        assert!(!out.exists());
    }

    #[test]
    fn test_startup_error_classification() {
        let dir = tempfile::tempdir().unwrap();
        let err = sort(
            &AnalysisConfig::default(),
            &RunOptions::new(vec![dir.path().join("missing.jsonl")], dir.path()),
        )
        .unwrap_err();
        assert!(is_startup_error(&err));

        let wrapped = anyhow::Error::from(HcError::configuration("bad rule")).context("loading rules");
        assert!(is_startup_error(&wrapped));

        let io = anyhow::Error::from(HcError::from(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )));
        assert!(!is_startup_error(&io));
    }

    #[test]
    fn test_load_config_profile_override() {
        let config = load_config(None, Some("commissioning")).unwrap();
        assert_eq!(config.selection, SelectionConfig::commissioning());
        assert!(load_config(None, Some("zone_x")).is_err());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, "calo_threshold_kev: 120\n").unwrap();
        let config = load_config(Some(&path), Some("half_zone_3")).unwrap();
        assert!((config.calo_threshold_kev - 120.0).abs() < 1e-9);
        assert_eq!(config.selection, SelectionConfig::half_zone(3));
    }
}
