//! # thermolog: four-channel serial temperature logger
//!
//! Reads comma-separated temperature frames from a serial device, keeps them
//! in an in-memory time series, optionally mirrors the series to a CSV file,
//! and feeds a rolling chart plus the latest value of every channel.
//!
//! ## Architecture
//!
//! - **Link**: [`link::SerialLink`] owns the device connection; the byte
//!   transport sits behind the [`link::Connector`] trait
//! - **Ingest**: a dedicated thread reads, decodes and appends; the
//!   foreground gets [`IngestEvent`]s over a bounded crossbeam channel
//! - **Storage**: [`TimeSeriesBuffer`] is a shared `RwLock`ed vector, one
//!   writer and any number of snapshot readers
//! - **Persistence**: [`persist::PersistenceSink`] rewrites the whole CSV
//!   file after each committed sample while enabled
//! - **Presentation**: [`presentation::PresentationFeed`] pulls chart windows
//!   and label text on a timer
//! - **Control**: [`ControlSurface`] maps operator commands onto a
//!   [`Session`]
//!
//! ## Wire format
//!
//! ```text
//! 23.45,24.10,22.98,25.00\n
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use thermolog::{AppConfig, AppState, ControlCommand, ControlSurface, Session};
//! use thermolog::link::default_connector;
//!
//! let config = AppConfig::load_or_default();
//! let session = Session::new(default_connector(), &config);
//! let mut control = ControlSurface::new(session, config, AppState::load_or_default());
//!
//! println!("{}", control.execute(ControlCommand::Connect(Some("COM3".into()))));
//! println!("{}", control.execute(ControlCommand::StartLogging));
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod link;
pub mod persist;
pub mod presentation;
pub mod series;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, AppState};
pub use control::{CommandStatus, ControlCommand, ControlSurface};
pub use error::{Result, ThermoLogError};
pub use frame::DecodeError;
pub use ingest::{IngestEvent, Session};
pub use series::{SeriesView, TimeSeriesBuffer};
pub use types::{
    Channel, ConnectionState, IngestStats, LatestValues, LoggingState, PersistenceState, Sample,
};
