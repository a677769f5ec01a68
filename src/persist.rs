//! Persistence of the time series to a CSV file
//!
//! While enabled, every committed sample triggers a full rewrite of the
//! output file from a snapshot of the whole series:
//!
//! ```text
//! Seconds,Sensor1,Sensor2,Sensor3,Sensor4
//! 0.00,23.45,24.1,22.98,25
//! 0.51,23.47,24.1,22.99,25
//! ```
//!
//! The rewrite goes to a hidden sibling file (`.name.tmp`) which is then
//! renamed over the target, so a reader opening the file at any moment sees
//! either the previous or the new complete table.
//!
//! Cost grows linearly with session length. For the intended bounded-length
//! runs at a few samples per second this stays well within the time between
//! samples.

use crate::error::{Result, ResultExt, ThermoLogError};
use crate::series::TimeSeriesBuffer;
use crate::types::{Channel, PersistenceState, Sample, SECONDS_COLUMN};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Write `samples` as CSV, header first
pub fn write_csv<W: Write>(writer: W, samples: &[Sample]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec![SECONDS_COLUMN];
    header.extend(Channel::ALL.iter().map(|c| c.name()));
    csv.write_record(&header)?;

    for sample in samples {
        let mut record = Vec::with_capacity(1 + Channel::ALL.len());
        record.push(format!("{:.2}", sample.elapsed_seconds()));
        record.extend(sample.values().iter().map(|v| v.to_string()));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Hidden sibling path used while rewriting `path`
fn temp_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy();
    Some(path.with_file_name(format!(".{}.tmp", name)))
}

/// Replace the file at `path` with a table of `samples`
///
/// On failure the target is untouched and the temporary file is removed.
pub fn write_series_file(path: &Path, samples: &[Sample]) -> Result<()> {
    let tmp = temp_path(path).ok_or_else(|| ThermoLogError::PersistenceWrite {
        path: path.to_path_buf(),
        reason: "not a file path".to_string(),
    })?;

    let result = (|| -> Result<()> {
        let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        write_csv(&mut writer, samples)?;
        writer.flush()?;
        std::fs::rename(&tmp, path).context("replacing output file")?;
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Rewrites the output file after each committed sample while enabled
#[derive(Debug, Default)]
pub struct PersistenceSink {
    state: PersistenceState,
    writes: u64,
    last_write_duration: Option<Duration>,
}

impl PersistenceSink {
    /// Create a disabled sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &PersistenceState {
        &self.state
    }

    /// Check whether saving is active
    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Target file, when enabled
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            PersistenceState::Enabled(path) => Some(path),
            PersistenceState::Disabled => None,
        }
    }

    /// Number of successful rewrites since the sink was created
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Duration of the most recent rewrite
    pub fn last_write_duration(&self) -> Option<Duration> {
        self.last_write_duration
    }

    /// Start saving to `path`
    ///
    /// The current series is written immediately, which both validates the
    /// target and produces at least the header row. If that fails the sink
    /// stays disabled and nothing is left on disk.
    pub fn enable(&mut self, path: impl Into<PathBuf>, series: &TimeSeriesBuffer) -> Result<()> {
        let path = path.into();

        if path.is_dir() {
            return Err(ThermoLogError::PersistenceRejected {
                path,
                reason: "is a directory".to_string(),
            });
        }

        if let Err(e) = self.rewrite(&path, series) {
            tracing::warn!("Rejected output file {:?}: {}", path, e);
            return Err(ThermoLogError::PersistenceRejected {
                path,
                reason: e.to_string(),
            });
        }

        tracing::info!("Saving data to {:?}", path);
        self.state = PersistenceState::Enabled(path);
        Ok(())
    }

    /// Stop saving; the file keeps its last contents
    pub fn disable(&mut self) {
        if let PersistenceState::Enabled(path) = &self.state {
            tracing::info!("Stopped saving to {:?}", path);
        }
        self.state = PersistenceState::Disabled;
    }

    /// Rewrite the output file with the full series
    ///
    /// Does nothing while disabled. A failed write disables the sink, so the
    /// failure is reported exactly once.
    pub fn on_sample_committed(&mut self, series: &TimeSeriesBuffer) -> Result<()> {
        let PersistenceState::Enabled(path) = &self.state else {
            return Ok(());
        };
        let path = path.clone();

        if let Err(e) = self.rewrite(&path, series) {
            tracing::error!("Writing {:?} failed, saving disabled: {}", path, e);
            self.state = PersistenceState::Disabled;
            return Err(ThermoLogError::PersistenceWrite {
                path,
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    fn rewrite(&mut self, path: &Path, series: &TimeSeriesBuffer) -> Result<()> {
        let started = Instant::now();
        let samples = series.snapshot_all();
        write_series_file(path, &samples)?;

        let elapsed = started.elapsed();
        self.writes += 1;
        self.last_write_duration = Some(elapsed);
        tracing::trace!("Wrote {} samples in {:?}", samples.len(), elapsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_with(samples: &[(f64, [f64; 4])]) -> TimeSeriesBuffer {
        let series = TimeSeriesBuffer::new();
        for (t, v) in samples {
            series.append(Sample::new(*t, *v)).unwrap();
        }
        series
    }

    #[test]
    fn test_write_csv_format() {
        let mut out = Vec::new();
        let samples = [
            Sample::new(0.0, [23.45, 24.1, 22.98, 25.0]),
            Sample::new(1.256, [1.0, -2.5, 3.0, 4.0]),
        ];
        write_csv(&mut out, &samples).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Seconds,Sensor1,Sensor2,Sensor3,Sensor4");
        assert_eq!(lines[1], "0.00,23.45,24.1,22.98,25");
        assert_eq!(lines[2], "1.26,1,-2.5,3,4");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_enable_writes_header_for_empty_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = PersistenceSink::new();

        sink.enable(&path, &TimeSeriesBuffer::new()).unwrap();

        assert_eq!(sink.state(), &PersistenceState::Enabled(path.clone()));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "Seconds,Sensor1,Sensor2,Sensor3,Sensor4");
    }

    #[test]
    fn test_enable_unwritable_location_stays_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let mut sink = PersistenceSink::new();

        let err = sink.enable(&path, &TimeSeriesBuffer::new()).unwrap_err();

        assert!(matches!(err, ThermoLogError::PersistenceRejected { .. }));
        assert_eq!(sink.state(), &PersistenceState::Disabled);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_enable_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PersistenceSink::new();
        let err = sink.enable(dir.path(), &TimeSeriesBuffer::new()).unwrap_err();
        assert!(matches!(err, ThermoLogError::PersistenceRejected { .. }));
        assert!(!sink.is_enabled());
    }

    #[test]
    fn test_rewrite_contains_full_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let series = series_with(&[(0.0, [1.0, 2.0, 3.0, 4.0])]);
        let mut sink = PersistenceSink::new();
        sink.enable(&path, &series).unwrap();

        series.append(Sample::new(0.5, [5.0, 6.0, 7.0, 8.0])).unwrap();
        sink.on_sample_committed(&series).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("0.50,5,6,7,8\n"));
        assert_eq!(sink.writes(), 2);
        assert!(sink.last_write_duration().is_some());

        // No temporary file is left next to the target
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["out.csv"]);
    }

    #[test]
    fn test_write_failure_disables_sink() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("run");
        std::fs::create_dir(&out_dir).unwrap();
        let path = out_dir.join("out.csv");

        let series = series_with(&[(0.0, [1.0, 2.0, 3.0, 4.0])]);
        let mut sink = PersistenceSink::new();
        sink.enable(&path, &series).unwrap();

        std::fs::remove_dir_all(&out_dir).unwrap();

        let err = sink.on_sample_committed(&series).unwrap_err();
        assert!(matches!(err, ThermoLogError::PersistenceWrite { .. }));
        assert!(!sink.is_enabled());

        // Reported once; further commits are no-ops
        assert!(sink.on_sample_committed(&series).is_ok());
    }

    #[test]
    fn test_disable_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = PersistenceSink::new();

        sink.disable();
        assert!(!sink.is_enabled());

        sink.enable(&path, &TimeSeriesBuffer::new()).unwrap();
        sink.disable();
        sink.disable();
        assert_eq!(sink.state(), &PersistenceState::Disabled);
        assert!(path.exists());
    }

    #[test]
    fn test_disabled_sink_does_not_write() {
        let series = series_with(&[(0.0, [1.0, 2.0, 3.0, 4.0])]);
        let mut sink = PersistenceSink::new();
        sink.on_sample_committed(&series).unwrap();
        assert_eq!(sink.writes(), 0);
    }
}
