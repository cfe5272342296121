//! Event container reading and writing.
//!
//! Two container formats, chosen by file extension:
//!
//! | Extension | Layout |
//! |-----------|--------|
//! | `.jsonl`, `.json` | one JSON record per line |
//! | `.hcz` | MessagePack records inside an LZ4 frame |

use super::EventRecord;
use crate::error::{HcError, Result};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    JsonLines,
    Compressed,
}

impl ContainerFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("jsonl") | Some("json") => Ok(ContainerFormat::JsonLines),
            Some("hcz") => Ok(ContainerFormat::Compressed),
            _ => Err(HcError::input(format!(
                "unknown event container extension: {}",
                path.display()
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::JsonLines => "jsonl",
            ContainerFormat::Compressed => "hcz",
        }
    }
}

/// Record limits of a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderLimits {
    pub max_record_per_file: Option<usize>,
    pub max_record_total: Option<usize>,
}

impl ReaderLimits {
    /// `per_file` records from each of `files` inputs.
    pub fn per_file(per_file: usize, files: usize) -> Self {
        Self {
            max_record_per_file: Some(per_file),
            max_record_total: Some(per_file * files),
        }
    }
}

enum Source {
    Json {
        lines: Lines<BufReader<File>>,
        line_number: usize,
    },
    Packed {
        reader: BufReader<FrameDecoder<BufReader<File>>>,
    },
}

impl Source {
    fn open(path: &Path) -> Result<Self> {
        let format = ContainerFormat::from_path(path)?;
        let file = File::open(path)
            .map_err(|e| HcError::input(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(match format {
            ContainerFormat::JsonLines => Source::Json {
                lines: BufReader::new(file).lines(),
                line_number: 0,
            },
            ContainerFormat::Compressed => Source::Packed {
                reader: BufReader::new(FrameDecoder::new(BufReader::new(file))),
            },
        })
    }

    fn next_record(&mut self, path: &Path) -> Option<Result<EventRecord>> {
        match self {
            Source::Json { lines, line_number } => loop {
                let line = match lines.next()? {
                    Ok(line) => line,
                    Err(e) => return Some(Err(e.into())),
                };
                *line_number += 1;
                if line.trim().is_empty() {
                    continue;
                }
                return Some(serde_json::from_str(&line).map_err(|e| {
                    HcError::input(format!("{}:{}: {}", path.display(), line_number, e))
                }));
            },
            Source::Packed { reader } => {
                let at_end = match reader.fill_buf() {
                    Ok(buf) => buf.is_empty(),
                    Err(e) => return Some(Err(e.into())),
                };
                if at_end {
                    None
                } else {
                    Some(rmp_serde::from_read(&mut *reader).map_err(HcError::from))
                }
            }
        }
    }
}

/// Sequential reader over a list of event containers.
pub struct EventReader {
    files: Vec<PathBuf>,
    limits: ReaderLimits,
    next_file: usize,
    current: Option<(PathBuf, Source)>,
    read_in_file: usize,
    read_total: usize,
}

impl EventReader {
    /// Open a reader over `files`, read in order.
    ///
    /// Fails with an input error when the list is empty, a file is missing or
    /// an extension is unknown.
    pub fn open(files: &[PathBuf], limits: ReaderLimits) -> Result<Self> {
        if files.is_empty() {
            return Err(HcError::input("no input file(s)"));
        }
        for file in files {
            if !file.is_file() {
                return Err(HcError::input(format!(
                    "input file not found: {}",
                    file.display()
                )));
            }
            ContainerFormat::from_path(file)?;
        }
        info!(files = files.len(), ?limits, "event reader opened");
        Ok(Self {
            files: files.to_vec(),
            limits,
            next_file: 0,
            current: None,
            read_in_file: 0,
            read_total: 0,
        })
    }

    pub fn records_read(&self) -> usize {
        self.read_total
    }

    fn total_reached(&self) -> bool {
        self.limits
            .max_record_total
            .map_or(false, |max| self.read_total >= max)
    }

    fn file_limit_reached(&self) -> bool {
        self.limits
            .max_record_per_file
            .map_or(false, |max| self.read_in_file >= max)
    }
}

impl Iterator for EventReader {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.total_reached() {
                return None;
            }
            if self.current.is_none() || self.file_limit_reached() {
                let path = self.files.get(self.next_file)?.clone();
                self.next_file += 1;
                self.read_in_file = 0;
                match Source::open(&path) {
                    Ok(source) => {
                        debug!(path = %path.display(), "reading event container");
                        self.current = Some((path, source));
                    }
                    Err(e) => return Some(Err(e)),
                }
            }

            let (path, source) = self.current.as_mut()?;
            match source.next_record(path) {
                Some(record) => {
                    self.read_in_file += 1;
                    self.read_total += 1;
                    return Some(record);
                }
                // Current file exhausted, move on
                None => self.current = None,
            }
        }
    }
}

enum Sink {
    Json(BufWriter<File>),
    Packed(FrameEncoder<BufWriter<File>>),
}

/// Append-only writer for one output subset.
pub struct EventWriter {
    path: PathBuf,
    sink: Sink,
    count: u64,
}

impl EventWriter {
    /// Create `path`, and its parent directories, for writing.
    pub fn create(path: &Path) -> Result<Self> {
        let format = ContainerFormat::from_path(path)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = BufWriter::new(File::create(path)?);
        let sink = match format {
            ContainerFormat::JsonLines => Sink::Json(file),
            ContainerFormat::Compressed => Sink::Packed(FrameEncoder::new(file)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            sink,
            count: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn write(&mut self, record: &EventRecord) -> Result<()> {
        match &mut self.sink {
            Sink::Json(out) => {
                serde_json::to_writer(&mut *out, record)?;
                out.write_all(b"\n")?;
            }
            Sink::Packed(out) => rmp_serde::encode::write_named(out, record)?,
        }
        self.count += 1;
        Ok(())
    }

    /// Flush everything to disk and return the number of records written.
    pub fn finish(self) -> Result<u64> {
        match self.sink {
            Sink::Json(mut out) => out.flush()?,
            Sink::Packed(out) => {
                let mut inner = out
                    .finish()
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                inner.flush()?;
            }
        }
        debug!(path = %self.path.display(), records = self.count, "event writer closed");
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RawHit, SimulatedData, CALO_HITS, GEIGER_HITS};
    use crate::geometry::{Position, SensorId};

    fn sample(id: u64) -> EventRecord {
        let mut sd = SimulatedData::new(Position::new(1.0, 2.0, 3.0));
        sd.add_step_hit(
            CALO_HITS,
            RawHit::new(SensorId::calo(0, 1, 2, 5, 0), 0.08, 1.0)
                .with_positions(Position::new(4300.0, 0.0, 10.0), Position::new(4310.0, 0.0, 11.0)),
        );
        sd.add_step_hit(GEIGER_HITS, RawHit::new(SensorId::geiger(0, 1, 8, 11), 0.0, 0.5));
        EventRecord::new(id, sd)
    }

    fn write_all(path: &Path, records: &[EventRecord]) -> u64 {
        let mut writer = EventWriter::create(path).unwrap();
        for r in records {
            writer.write(r).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_unknown_extension_is_input_error() {
        let err = ContainerFormat::from_path(Path::new("events.brio")).unwrap_err();
        assert!(matches!(err, HcError::Input(_)));
    }

    #[test]
    fn test_no_input_files() {
        let err = EventReader::open(&[], ReaderLimits::default()).err().unwrap();
        assert!(matches!(err, HcError::Input(_)));
    }

    #[test]
    fn test_missing_input_file() {
        let err = EventReader::open(
            &[PathBuf::from("/nonexistent/run.jsonl")],
            ReaderLimits::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, HcError::Input(_)));
    }

    #[test]
    fn test_jsonl_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/run.jsonl");
        let records = vec![sample(0), EventRecord::empty(1), sample(2)];
        assert_eq!(write_all(&path, &records), 3);

        let reader = EventReader::open(&[path], ReaderLimits::default()).unwrap();
        let read: Vec<EventRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(read, records);
    }

    #[test]
    fn test_compressed_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.hcz");
        let records = vec![sample(0), EventRecord::empty(1), sample(2)];
        write_all(&path, &records);

        let reader = EventReader::open(&[path], ReaderLimits::default()).unwrap();
        let read: Vec<EventRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(read, records);
    }

    #[test]
    fn test_limits_per_file_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.hcz");
        write_all(&a, &(0..5).map(sample).collect::<Vec<_>>());
        write_all(&b, &(10..15).map(sample).collect::<Vec<_>>());

        let mut reader = EventReader::open(&[a.clone(), b.clone()], ReaderLimits::per_file(2, 2)).unwrap();
        let ids: Vec<u64> = reader.by_ref().map(|r| r.unwrap().id).collect();
        assert_eq!(ids, vec![0, 1, 10, 11]);
        assert_eq!(reader.records_read(), 4);

        let limits = ReaderLimits {
            max_record_per_file: None,
            max_record_total: Some(7),
        };
        let reader = EventReader::open(&[a, b], limits).unwrap();
        assert_eq!(reader.count(), 7);
    }

    #[test]
    fn test_blank_lines_skipped_and_bad_line_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        std::fs::write(&path, "{\"id\": 3}\n\n{not json}\n").unwrap();
        let mut reader = EventReader::open(&[path], ReaderLimits::default()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), EventRecord::empty(3));
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.to_string().contains(":3:"));
    }
}
