//! Batch persistence to per-device CSV files.
//!
//! Every `(role, serial)` pair gets its own append-only file. The 16-column
//! header is written exactly once, when the file is found empty at open time,
//! so re-recording into an existing directory keeps appending cleanly.

use crate::buffer::BufferSnapshot;
use crate::device::Role;
use crate::sampler::PoseSample;
use crate::stats::SessionStats;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Column header for every output file: 4 identity/time columns followed by
/// the flattened 3×4 transform, row-major.
pub const CSV_HEADER: [&str; 16] = [
    "Timestamp", "DeviceID", "DeviceName", "DeviceSerial", "M00", "M01", "M02", "M03", "M10",
    "M11", "M12", "M13", "M20", "M21", "M22", "M23",
];

/// Supported persistence formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
}

impl OutputFormat {
    /// Parse a format selector. Anything but `csv` is unsupported.
    pub fn from_selector(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Errors while opening or writing an output file.
#[derive(Debug)]
pub enum PersistenceError {
    Open { path: PathBuf, message: String },
    Write { path: PathBuf, message: String },
}

impl PersistenceError {
    pub fn path(&self) -> &Path {
        match self {
            PersistenceError::Open { path, .. } | PersistenceError::Write { path, .. } => path,
        }
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Open { path, message } => {
                write!(f, "could not open {}: {message}", path.display())
            }
            PersistenceError::Write { path, message } => {
                write!(f, "could not write {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Writes drained batches to per-device CSV files.
///
/// File handles are owned exclusively by the sink and held open for the
/// session. Each `(role, serial)` pair is assigned one path for the whole
/// session; sanitizing a serial for the file name can make two distinct
/// serials spell the same name, so colliding assignments get a numeric
/// suffix instead of sharing a file.
pub struct CsvSink {
    output_dir: PathBuf,
    files: HashMap<PathBuf, csv::Writer<File>>,
    assignments: HashMap<(Role, String), PathBuf>,
    claimed: HashSet<PathBuf>,
}

impl CsvSink {
    /// Create a sink rooted at `output_dir`, creating the directory if needed.
    pub fn new(output_dir: &Path) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(output_dir).map_err(|e| PersistenceError::Open {
            path: output_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            files: HashMap::new(),
            assignments: HashMap::new(),
            claimed: HashSet::new(),
        })
    }

    /// Persist a drained snapshot.
    ///
    /// Rows land in their files in sampling order. A failure on one file does
    /// not stop writes to the others; the first error is returned after every
    /// file has been attempted.
    pub fn persist(
        &mut self,
        snapshot: BufferSnapshot,
        stats: &SessionStats,
    ) -> Result<(), PersistenceError> {
        let mut first_error: Option<PersistenceError> = None;
        // Files that already failed this call; skip their remaining rows so a
        // file never ends up with a gap in the middle of a batch.
        let mut failed: HashSet<PathBuf> = HashSet::new();
        let mut written: u64 = 0;

        for (role, samples) in snapshot.iter() {
            for sample in samples {
                let path = self.resolve_path(role, &sample.serial);
                if failed.contains(&path) {
                    continue;
                }
                match self.append(&path, sample) {
                    Ok(()) => written += 1,
                    Err(e) => {
                        failed.insert(path);
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        for writer in self.files.values_mut() {
            // Flush errors surface the same way as write errors.
            if let Err(e) = writer.flush() {
                first_error.get_or_insert(PersistenceError::Write {
                    path: self.output_dir.clone(),
                    message: e.to_string(),
                });
            }
        }

        stats.record_rows_written(written);
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of distinct output files opened so far.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// The session-stable output path for a `(role, serial)` pair.
    ///
    /// First claim wins the plain `{role}_{serial}.csv` name; a later pair
    /// whose sanitized serial spells the same name gets a `-2`, `-3`, ...
    /// suffix so distinct devices never share a file.
    fn resolve_path(&mut self, role: Role, serial: &str) -> PathBuf {
        let key = (role, serial.to_string());
        if let Some(path) = self.assignments.get(&key) {
            return path.clone();
        }

        let base = format!("{}_{}", role.label(), sanitize(serial));
        let mut candidate = self.output_dir.join(format!("{base}.csv"));
        let mut suffix = 2;
        while self.claimed.contains(&candidate) {
            candidate = self.output_dir.join(format!("{base}-{suffix}.csv"));
            suffix += 1;
        }

        self.claimed.insert(candidate.clone());
        self.assignments.insert(key, candidate.clone());
        candidate
    }

    fn append(&mut self, path: &Path, sample: &PoseSample) -> Result<(), PersistenceError> {
        if !self.files.contains_key(path) {
            let writer = self.open_file(path)?;
            self.files.insert(path.to_path_buf(), writer);
        }

        let writer = self.files.get_mut(path).ok_or(PersistenceError::Write {
            path: path.to_path_buf(),
            message: "writer missing".to_string(),
        })?;

        let mut record = Vec::with_capacity(16);
        record.push(sample.timestamp.to_rfc3339());
        record.push(sample.slot.to_string());
        record.push(sample.name.clone());
        record.push(sample.serial.clone());
        for value in sample.transform {
            record.push(value.to_string());
        }

        writer
            .write_record(&record)
            .map_err(|e| PersistenceError::Write {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn open_file(&self, path: &Path) -> Result<csv::Writer<File>, PersistenceError> {
        let open_err = |e: std::io::Error| PersistenceError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        let is_new = file.metadata().map_err(open_err)?.len() == 0;

        let mut writer = csv::Writer::from_writer(file);
        if is_new {
            writer
                .write_record(CSV_HEADER)
                .map_err(|e| PersistenceError::Write {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
        }
        Ok(writer)
    }
}

/// Make a serial safe for use in a file name.
fn sanitize(serial: &str) -> String {
    serial
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleBuffer;
    use chrono::Utc;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pose-capture-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample(slot: u32, role: Role, serial: &str, transform: [f32; 12]) -> PoseSample {
        PoseSample {
            timestamp: Utc::now(),
            slot,
            role,
            name: format!("device-{slot}"),
            serial: serial.to_string(),
            transform,
        }
    }

    fn snapshot_of(samples: Vec<PoseSample>) -> BufferSnapshot {
        let mut buffer = SampleBuffer::new(usize::MAX);
        buffer.absorb(samples);
        buffer.drain()
    }

    #[test]
    fn test_format_selector() {
        assert_eq!(OutputFormat::from_selector("csv"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_selector("CSV"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_selector("xlsx"), None);
    }

    #[test]
    fn test_header_written_exactly_once_across_flushes() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        for _ in 0..3 {
            let snap = snapshot_of(vec![sample(0, Role::Headset, "HMD-1", [0.0; 12])]);
            sink.persist(snap, &stats).unwrap();
        }

        let content = std::fs::read_to_string(dir.join("headset_HMD-1.csv")).unwrap();
        let header_lines = content
            .lines()
            .filter(|l| l.starts_with("Timestamp,"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(content.lines().count(), 4);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_matrix_round_trip() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        let transform = [
            0.5, -0.25, 1.0, 3.125, 0.0, 1.0, 0.0, -2.5, 0.125, 0.0, 1.0, 0.0625,
        ];
        let snap = snapshot_of(vec![sample(2, Role::Tracker, "TRK-7", transform)]);
        sink.persist(snap, &stats).unwrap();

        let content = std::fs::read_to_string(dir.join("tracker_TRK-7.csv")).unwrap();
        let data_row = content.lines().nth(1).unwrap();
        let fields: Vec<&str> = data_row.split(',').collect();
        assert_eq!(fields.len(), 16);
        for (i, expected) in transform.iter().enumerate() {
            let parsed: f32 = fields[4 + i].parse().unwrap();
            assert!((parsed - expected).abs() < 1e-6);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_one_file_per_role_serial_pair() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        let snap = snapshot_of(vec![
            sample(0, Role::Headset, "HMD-1", [0.0; 12]),
            sample(1, Role::Controller, "CTL-1", [0.0; 12]),
            sample(2, Role::Tracker, "TRK-1", [0.0; 12]),
            sample(3, Role::Tracker, "TRK-2", [0.0; 12]),
        ]);
        sink.persist(snap, &stats).unwrap();

        assert_eq!(sink.file_count(), 4);
        assert!(dir.join("tracker_TRK-1.csv").exists());
        assert!(dir.join("tracker_TRK-2.csv").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rows_appended_in_sampling_order() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        let mut samples = Vec::new();
        for i in 0..5 {
            let mut transform = [0.0; 12];
            transform[3] = i as f32;
            samples.push(sample(1, Role::Controller, "CTL-1", transform));
        }
        sink.persist(snapshot_of(samples), &stats).unwrap();

        let content = std::fs::read_to_string(dir.join("controller_CTL-1.csv")).unwrap();
        let m03: Vec<&str> = content
            .lines()
            .skip(1)
            .map(|l| l.split(',').nth(7).unwrap())
            .collect();
        assert_eq!(m03, vec!["0", "1", "2", "3", "4"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_colliding_sanitized_serials_get_distinct_files() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        // Both serials sanitize to "TRK-1"; they must not share a file.
        for _ in 0..2 {
            let snap = snapshot_of(vec![
                sample(0, Role::Tracker, "TRK 1", [0.0; 12]),
                sample(1, Role::Tracker, "TRK-1", [0.0; 12]),
            ]);
            sink.persist(snap, &stats).unwrap();
        }

        assert_eq!(sink.file_count(), 2);
        let first = std::fs::read_to_string(dir.join("tracker_TRK-1.csv")).unwrap();
        let second = std::fs::read_to_string(dir.join("tracker_TRK-1-2.csv")).unwrap();
        for content in [&first, &second] {
            let headers = content
                .lines()
                .filter(|l| l.starts_with("Timestamp,"))
                .count();
            assert_eq!(headers, 1);
            assert_eq!(content.lines().count(), 3);
        }
        // Assignment is stable: each file carries only its own serial.
        assert!(first.lines().skip(1).all(|l| l.contains("TRK 1")));
        assert!(second.lines().skip(1).all(|l| l.contains("TRK-1")));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failing_file_does_not_block_others() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        // Occupy one target path with a directory so its open fails.
        let blocked = dir.join("tracker_TRK-BAD.csv");
        std::fs::create_dir_all(&blocked).unwrap();

        let snap = snapshot_of(vec![
            sample(0, Role::Headset, "HMD-OK", [0.0; 12]),
            sample(1, Role::Tracker, "TRK-BAD", [0.0; 12]),
            sample(2, Role::Tracker, "TRK-OK", [0.0; 12]),
        ]);
        let err = sink.persist(snap, &stats).unwrap_err();
        assert_eq!(err.path(), blocked.as_path());

        // The other files still received their rows.
        let headset = std::fs::read_to_string(dir.join("headset_HMD-OK.csv")).unwrap();
        let tracker = std::fs::read_to_string(dir.join("tracker_TRK-OK.csv")).unwrap();
        assert_eq!(headset.lines().count(), 2);
        assert_eq!(tracker.lines().count(), 2);
        assert_eq!(stats.snapshot().rows_written, 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sanitized_serial_in_file_name() {
        let dir = temp_dir();
        let mut sink = CsvSink::new(&dir).unwrap();
        let stats = SessionStats::new();

        let snap = snapshot_of(vec![sample(0, Role::Tracker, "LHR/00 1", [0.0; 12])]);
        sink.persist(snap, &stats).unwrap();
        assert!(dir.join("tracker_LHR-00-1.csv").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
