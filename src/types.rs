//! Core data types for thermolog
//!
//! # Main Types
//!
//! - [`Channel`] - The four fixed temperature channels (`Sensor1..Sensor4`)
//! - [`Sample`] - One decoded reading stamped with session-relative seconds
//! - [`LatestValues`] - Most recent value per channel, for label displays
//! - [`ConnectionState`] / [`LoggingState`] / [`PersistenceState`] - the
//!   published states the control surface displays
//! - [`IngestStats`] - Counters describing the health of the ingest loop

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Number of temperature channels in every frame
pub const CHANNEL_COUNT: usize = 4;

/// Column header of the time axis in persisted output
pub const SECONDS_COLUMN: &str = "Seconds";

/// One of the four temperature inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Sensor1,
    Sensor2,
    Sensor3,
    Sensor4,
}

impl Channel {
    /// All channels in wire order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Sensor1,
        Channel::Sensor2,
        Channel::Sensor3,
        Channel::Sensor4,
    ];

    /// Position of this channel within a frame
    pub fn index(self) -> usize {
        match self {
            Channel::Sensor1 => 0,
            Channel::Sensor2 => 1,
            Channel::Sensor3 => 2,
            Channel::Sensor4 => 3,
        }
    }

    /// Display and column name
    pub fn name(self) -> &'static str {
        match self {
            Channel::Sensor1 => "Sensor1",
            Channel::Sensor2 => "Sensor2",
            Channel::Sensor3 => "Sensor3",
            Channel::Sensor4 => "Sensor4",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single decoded reading
///
/// The timestamp is assigned on arrival from the session clock; the wire
/// payload carries none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    elapsed_seconds: f64,
    values: [f64; CHANNEL_COUNT],
}

impl Sample {
    /// Create a sample from a timestamp and channel values in wire order
    pub fn new(elapsed_seconds: f64, values: [f64; CHANNEL_COUNT]) -> Self {
        Self {
            elapsed_seconds,
            values,
        }
    }

    /// Seconds since the session clock origin
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    /// All channel values in wire order
    pub fn values(&self) -> &[f64; CHANNEL_COUNT] {
        &self.values
    }

    /// Value for a single channel
    pub fn value(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }
}

/// Most recent value per channel
///
/// Before the first sample arrives every channel reads as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatestValues {
    values: Option<[f64; CHANNEL_COUNT]>,
    elapsed_seconds: Option<f64>,
}

impl LatestValues {
    /// Overwrite with the values of a committed sample
    pub fn update(&mut self, sample: &Sample) {
        self.values = Some(*sample.values());
        self.elapsed_seconds = Some(sample.elapsed_seconds());
    }

    /// Latest value of a channel, if any sample has arrived
    pub fn get(&self, channel: Channel) -> Option<f64> {
        self.values.map(|v| v[channel.index()])
    }

    /// Timestamp of the sample these values came from
    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.elapsed_seconds
    }

    /// Whether any sample has been recorded
    pub fn has_reading(&self) -> bool {
        self.values.is_some()
    }

    /// Iterate `(channel, value)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, Option<f64>)> + '_ {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Forget all values
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// State of the serial link
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No link open
    #[default]
    Disconnected,
    /// Link open on the named port
    Connected(String),
    /// The last connect attempt failed or the device went away
    Error(String),
}

impl ConnectionState {
    /// Check whether a link is open
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected(port) => write!(f, "Connected ({})", port),
            ConnectionState::Error(reason) => write!(f, "Error: {}", reason),
        }
    }
}

/// State of the ingest loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingState {
    /// No ingest thread
    #[default]
    Idle,
    /// Ingest thread reading and appending
    Running,
    /// Stop requested; waiting for the current read attempt to finish
    Stopping,
}

impl std::fmt::Display for LoggingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggingState::Idle => write!(f, "Idle"),
            LoggingState::Running => write!(f, "Running"),
            LoggingState::Stopping => write!(f, "Stopping..."),
        }
    }
}

/// State of the persistence sink
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PersistenceState {
    #[default]
    Disabled,
    Enabled(PathBuf),
}

impl PersistenceState {
    /// Check whether saving is active
    pub fn is_enabled(&self) -> bool {
        matches!(self, PersistenceState::Enabled(_))
    }
}

impl std::fmt::Display for PersistenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceState::Disabled => write!(f, "Not saving"),
            PersistenceState::Enabled(path) => write!(f, "Saving to {}", path.display()),
        }
    }
}

/// Statistics about the ingest loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    /// Lines received from the link, including rejected ones
    pub lines_read: u64,
    /// Samples appended to the series
    pub samples_committed: u64,
    /// Lines rejected by the decoder
    pub decode_errors: u64,
    /// Read attempts that timed out
    pub timeouts: u64,
    /// Successful full rewrites of the output file
    pub persistence_writes: u64,
    /// Duration of the most recent rewrite
    pub last_write_duration: Option<Duration>,
    /// Events dropped because the event queue was full
    pub dropped_events: u64,
}

impl IngestStats {
    /// Fraction of received lines that decoded, as a percentage
    pub fn decode_success_rate(&self) -> f64 {
        if self.lines_read == 0 {
            100.0
        } else {
            (self.samples_committed as f64 / self.lines_read as f64) * 100.0
        }
    }
}
