//! Error handling for thermolog
//!
//! This module defines the crate-wide error type and a Result alias. Line
//! decode failures have their own type ([`DecodeError`]) because the ingest
//! loop absorbs them locally; everything else funnels into [`ThermoLogError`].

use crate::frame::DecodeError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for thermolog operations
#[derive(Error, Debug)]
pub enum ThermoLogError {
    /// The serial endpoint could not be opened
    #[error("Failed to open {port}: {reason}")]
    LinkOpen { port: String, reason: String },

    /// The link was closed explicitly or the device went away
    #[error("Link closed: {0}")]
    LinkClosed(String),

    /// An operation needed an open link
    #[error("Not connected to a device")]
    NotConnected,

    /// A line could not be decoded into a sample
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A sample would break the time ordering of the series
    #[error("Sample at {got:.3}s is older than the last sample at {last:.3}s")]
    OutOfOrder { last: f64, got: f64 },

    /// Writing the series to disk failed; persistence has been disabled
    #[error("Failed to write {path:?}: {reason}")]
    PersistenceWrite { path: PathBuf, reason: String },

    /// The persistence target was rejected when enabling
    #[error("Cannot save to {path:?}: {reason}")]
    PersistenceRejected { path: PathBuf, reason: String },

    /// The requested operation is not valid in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ThermoLogError>,
    },
}

impl ThermoLogError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ThermoLogError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serialport::Error> for ThermoLogError {
    fn from(err: serialport::Error) -> Self {
        ThermoLogError::Io(err.into())
    }
}

/// Result type alias for thermolog operations
pub type Result<T> = std::result::Result<T, ThermoLogError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ThermoLogError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ThermoLogError::from(e).with_context(f()))
    }
}
