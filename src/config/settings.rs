//! Settings sections of the application config
//!
//! # Main Types
//!
//! - [`SerialSettings`] - Baud rate, read timeout and preferred port
//! - [`PresentationSettings`] - Chart window size and refresh periods
//! - [`PersistenceSettings`] - Default output directory and file naming
//! - [`IngestSettings`] - Event queue capacity for the ingest thread

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default baud rate of the temperature device
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default number of trailing samples shown on the chart
pub const DEFAULT_CHART_WINDOW: usize = 50;

/// Default chart and label refresh period in milliseconds
pub const DEFAULT_REFRESH_MS: u64 = 500;

/// Default capacity of the ingest event queue
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Default extension for saved data
pub const OUTPUT_EXTENSION: &str = "csv";

/// Serial link parameters
///
/// Framing is fixed at 8N1 without flow control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialSettings {
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Port to preselect when none was used before
    #[serde(default)]
    pub default_port: Option<String>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            default_port: None,
        }
    }
}

impl SerialSettings {
    /// Per-read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Builder-style override of the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }
}

/// Chart and label refresh settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresentationSettings {
    /// Number of trailing samples drawn on the chart
    #[serde(default = "default_chart_window")]
    pub chart_window: usize,

    /// Chart redraw period in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub chart_refresh_ms: u64,

    /// Label refresh period in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub label_refresh_ms: u64,

    /// Width of the text chart in columns
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,
}

fn default_chart_window() -> usize {
    DEFAULT_CHART_WINDOW
}

fn default_refresh_ms() -> u64 {
    DEFAULT_REFRESH_MS
}

fn default_chart_width() -> usize {
    DEFAULT_CHART_WINDOW
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            chart_window: DEFAULT_CHART_WINDOW,
            chart_refresh_ms: DEFAULT_REFRESH_MS,
            label_refresh_ms: DEFAULT_REFRESH_MS,
            chart_width: DEFAULT_CHART_WINDOW,
        }
    }
}

impl PresentationSettings {
    /// Chart redraw period
    pub fn chart_period(&self) -> Duration {
        Duration::from_millis(self.chart_refresh_ms)
    }

    /// Label refresh period
    pub fn label_period(&self) -> Duration {
        Duration::from_millis(self.label_refresh_ms)
    }
}

/// Default output location for saved data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceSettings {
    /// Directory for generated file names (current directory when unset)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Prefix of generated file names
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_file_prefix() -> String {
    "temperatures".to_string()
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

impl PersistenceSettings {
    /// Timestamped output path, e.g. `temperatures_20240131_142500.csv`
    pub fn default_output_path(&self, now: DateTime<Local>) -> PathBuf {
        let name = format!(
            "{}_{}.{}",
            self.file_prefix,
            now.format("%Y%m%d_%H%M%S"),
            OUTPUT_EXTENSION
        );
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Ingest thread tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestSettings {
    /// Capacity of the event queue to the control surface
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_output_path() {
        let now = Local.with_ymd_and_hms(2024, 1, 31, 14, 25, 0).unwrap();

        let settings = PersistenceSettings::default();
        assert_eq!(
            settings.default_output_path(now),
            PathBuf::from("temperatures_20240131_142500.csv")
        );

        let settings = PersistenceSettings {
            output_dir: Some(PathBuf::from("/data")),
            file_prefix: "kiln".to_string(),
        };
        assert_eq!(
            settings.default_output_path(now),
            PathBuf::from("/data/kiln_20240131_142500.csv")
        );
    }

    #[test]
    fn test_read_timeout_override() {
        let settings = SerialSettings::default().with_read_timeout(Duration::from_millis(20));
        assert_eq!(settings.read_timeout(), Duration::from_millis(20));

        let settings = SerialSettings::default().with_read_timeout(Duration::ZERO);
        assert_eq!(settings.read_timeout_ms, 1);
    }
}
