//! Acquisition session: link lifecycle, ingest thread and shared state
//!
//! A [`Session`] owns everything one logger instance needs: the serial link,
//! the time series, the latest values, the persistence sink and the session
//! clock. There are no globals; two sessions in one process do not interact.
//!
//! # Threads
//!
//! - **Foreground** (the caller): issues commands, pulls snapshots, drains
//!   [`IngestEvent`]s
//! - **Ingest** (`thermolog-ingest`): runs an [`IngestLoop`] while logging
//!
//! While logging, the ingest thread owns the link; the session holds only
//! the join handle, which yields the link back when the thread finishes.
//!
//! # States
//!
//! ```text
//!          start()              stop()
//!   Idle ----------> Running ----------> Stopping
//!    ^                  |                   |
//!    |   link closed    |    thread ends    |
//!    +------------------+-------------------+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use thermolog::{AppConfig, Session};
//! use thermolog::link::default_connector;
//!
//! let mut session = Session::new(default_connector(), &AppConfig::default());
//! session.connect("/dev/ttyUSB0");
//! session.start()?;
//!
//! for event in session.drain_events() {
//!     println!("{:?}", event);
//! }
//! let chart = session.series().snapshot_tail(50);
//! ```

mod counters;
mod worker;

pub use counters::IngestCounters;
pub use worker::IngestLoop;

use crate::config::{AppConfig, SerialSettings};
use crate::error::{Result, ThermoLogError};
use crate::frame::DecodeError;
use crate::link::{Connector, PortInfo, SerialLink};
use crate::persist::PersistenceSink;
use crate::series::{SeriesView, TimeSeriesBuffer};
use crate::types::{
    ConnectionState, IngestStats, LatestValues, LoggingState, PersistenceState, Sample,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Name of the ingest thread
pub const INGEST_THREAD_NAME: &str = "thermolog-ingest";

/// Notification from the ingest thread
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    /// A sample was appended to the series
    SampleCommitted(Sample),
    /// A line was rejected by the decoder
    DecodeFailed { line: String, error: DecodeError },
    /// Rewriting the output file failed; saving is now disabled
    PersistenceFailed(String),
    /// The device went away; logging has ended
    LinkClosed(String),
    /// The ingest thread has exited
    Stopped,
}

/// Sink state as last published, readable while a rewrite is in progress
#[derive(Debug, Clone, Default)]
struct PersistenceStatus {
    state: PersistenceState,
    writes: u64,
    last_write_duration: Option<Duration>,
}

/// State shared between the session and its ingest thread
#[derive(Debug, Default)]
pub(crate) struct Shared {
    series: TimeSeriesBuffer,
    latest: RwLock<LatestValues>,
    connection: RwLock<ConnectionState>,
    /// Held for the whole of a rewrite; only sink operations take it
    sink: Mutex<PersistenceSink>,
    persistence: RwLock<PersistenceStatus>,
    counters: IngestCounters,
    stop: AtomicBool,
}

impl Shared {
    fn latest(&self) -> LatestValues {
        *self.latest.read().unwrap_or_else(|e| e.into_inner())
    }

    fn update_latest(&self, sample: &Sample) {
        self.latest
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .update(sample);
    }

    fn clear_latest(&self) {
        self.latest
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn connection(&self) -> ConnectionState {
        self.connection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_connection(&self, state: ConnectionState) {
        *self.connection.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn lock_sink(&self) -> MutexGuard<'_, PersistenceSink> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy the sink's state out for readers that must not wait on a write
    fn publish_sink(&self, sink: &PersistenceSink) {
        *self.persistence.write().unwrap_or_else(|e| e.into_inner()) = PersistenceStatus {
            state: sink.state().clone(),
            writes: sink.writes(),
            last_write_duration: sink.last_write_duration(),
        };
    }

    fn persistence(&self) -> PersistenceStatus {
        self.persistence
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// One logger instance
pub struct Session {
    /// Connector used for enumeration and for opening the link
    connector: Arc<dyn Connector>,
    /// Serial parameters for new links
    settings: SerialSettings,
    /// The link, while no ingest thread owns it
    link: Option<SerialLink>,
    /// The ingest thread, returning the link when it ends
    worker: Option<JoinHandle<SerialLink>>,
    /// State shared with the ingest thread
    shared: Arc<Shared>,
    /// Session clock origin, set on the first start after a reset
    origin: Option<Instant>,
    /// Event queue, ingest side
    event_tx: Sender<IngestEvent>,
    /// Event queue, foreground side
    event_rx: Receiver<IngestEvent>,
}

impl Session {
    /// Create an idle, disconnected session
    pub fn new(connector: Arc<dyn Connector>, config: &AppConfig) -> Self {
        let (event_tx, event_rx) = bounded(config.ingest.event_capacity.max(1));
        let link = SerialLink::new(Arc::clone(&connector), config.serial.clone());

        Self {
            connector,
            settings: config.serial.clone(),
            link: Some(link),
            worker: None,
            shared: Arc::new(Shared::default()),
            origin: None,
            event_tx,
            event_rx,
        }
    }

    // ==================== Link ====================

    /// Endpoints that can be connected to
    pub fn list_ports(&self) -> Vec<PortInfo> {
        self.connector.list_ports()
    }

    /// Open `port`, replacing any current connection
    ///
    /// A running ingest thread is stopped and joined first.
    pub fn connect(&mut self, port: &str) -> ConnectionState {
        self.stop_and_join();
        let state = self.link_mut().connect(port);
        self.shared.set_connection(state.clone());
        state
    }

    /// Close the connection, stopping logging first
    pub fn disconnect(&mut self) {
        self.stop_and_join();
        self.link_mut().disconnect();
        self.shared.set_connection(ConnectionState::Disconnected);
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection()
    }

    // ==================== Logging ====================

    /// Start the ingest thread
    ///
    /// Already running is a no-op. A run that is still stopping is joined
    /// and replaced by a fresh one. The session clock starts on the first
    /// call after a reset and keeps running across stop/start.
    pub fn start(&mut self) -> Result<()> {
        self.reap();
        if self.worker.is_some() {
            if !self.shared.stop.load(Ordering::SeqCst) {
                return Ok(());
            }
            self.stop_and_join();
        }

        let link = match self.link.take() {
            Some(link) if link.is_open() => link,
            other => {
                self.link = other;
                return Err(ThermoLogError::NotConnected);
            }
        };

        let origin = *self.origin.get_or_insert_with(Instant::now);
        self.shared.stop.store(false, Ordering::SeqCst);

        let ingest = IngestLoop::new(link, Arc::clone(&self.shared), origin, self.event_tx.clone());
        let spawned = std::thread::Builder::new()
            .name(INGEST_THREAD_NAME.to_string())
            .spawn(move || ingest.run());

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                // The link went down with the closure
                tracing::error!("Failed to spawn ingest thread: {}", e);
                self.link = Some(SerialLink::new(
                    Arc::clone(&self.connector),
                    self.settings.clone(),
                ));
                self.shared.set_connection(ConnectionState::Disconnected);
                Err(ThermoLogError::Io(e).with_context("Failed to start logging"))
            }
        }
    }

    /// Ask the ingest thread to stop after its current read
    ///
    /// Does not block. Stopping while idle is a no-op.
    pub fn stop(&mut self) {
        self.reap();
        if self.worker.is_some() && !self.shared.stop.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested");
        }
    }

    /// Stop and wait for the ingest thread to hand the link back
    pub fn stop_and_join(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.shared.stop.store(true, Ordering::SeqCst);
            self.join(handle);
        }
    }

    /// Collect a finished ingest thread, if any
    ///
    /// Call periodically from the foreground so a run that ended on its own
    /// (device loss) settles back to idle with the link returned.
    pub fn reap(&mut self) {
        if self.worker.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.worker.take() {
                self.join(handle);
            }
        }
    }

    fn join(&mut self, handle: JoinHandle<SerialLink>) {
        match handle.join() {
            Ok(link) => {
                self.shared.set_connection(link.state().clone());
                self.link = Some(link);
            }
            Err(_) => {
                tracing::error!("Ingest thread panicked");
                self.link = Some(SerialLink::new(
                    Arc::clone(&self.connector),
                    self.settings.clone(),
                ));
                self.shared
                    .set_connection(ConnectionState::Error("ingest thread panicked".to_string()));
            }
        }
    }

    /// Current logging state
    pub fn logging_state(&self) -> LoggingState {
        match &self.worker {
            None => LoggingState::Idle,
            Some(handle) if handle.is_finished() => LoggingState::Idle,
            Some(_) if self.shared.stop.load(Ordering::SeqCst) => LoggingState::Stopping,
            Some(_) => LoggingState::Running,
        }
    }

    /// Discard the series, latest values, counters and clock origin
    ///
    /// Only allowed while idle.
    pub fn reset(&mut self) -> Result<()> {
        self.reap();
        if self.worker.is_some() {
            return Err(ThermoLogError::InvalidState(
                "cannot reset while logging".to_string(),
            ));
        }

        self.shared.series.reset();
        self.shared.clear_latest();
        self.shared.counters.reset();
        self.origin = None;
        tracing::info!("Session reset");
        Ok(())
    }

    /// Stop if needed, reset, then start logging again from zero
    pub fn new_session(&mut self) -> Result<()> {
        self.stop_and_join();
        self.reset()?;
        self.start()
    }

    // ==================== Persistence ====================

    /// Start saving to `path`
    pub fn enable_persistence(&self, path: impl Into<PathBuf>) -> Result<()> {
        let mut sink = self.shared.lock_sink();
        let result = sink.enable(path, &self.shared.series);
        self.shared.publish_sink(&sink);
        result
    }

    /// Stop saving
    pub fn disable_persistence(&self) {
        let mut sink = self.shared.lock_sink();
        sink.disable();
        self.shared.publish_sink(&sink);
    }

    /// Current persistence state
    ///
    /// Does not wait for a rewrite in progress.
    pub fn persistence_state(&self) -> PersistenceState {
        self.shared.persistence().state
    }

    // ==================== Data ====================

    /// Read-only handle to the time series
    ///
    /// Only the ingest thread appends and only [`Session::reset`] clears.
    pub fn series(&self) -> SeriesView {
        self.shared.series.view()
    }

    /// Copy of the latest values
    pub fn latest(&self) -> LatestValues {
        self.shared.latest()
    }

    /// Seconds on the session clock, if it has started
    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.origin.map(|o| o.elapsed().as_secs_f64())
    }

    /// Ingest and persistence statistics
    pub fn stats(&self) -> IngestStats {
        let mut stats = self.shared.counters.snapshot();
        let persistence = self.shared.persistence();
        stats.persistence_writes = persistence.writes;
        stats.last_write_duration = persistence.last_write_duration;
        stats
    }

    // ==================== Events ====================

    /// Receiver for use in `select!`
    pub fn events(&self) -> &Receiver<IngestEvent> {
        &self.event_rx
    }

    /// All pending events
    pub fn drain_events(&self) -> Vec<IngestEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Stop logging and close the link
    pub fn shutdown(&mut self) {
        self.disconnect();
        self.disable_persistence();
    }

    fn link_mut(&mut self) -> &mut SerialLink {
        let connector = &self.connector;
        let settings = &self.settings;
        self.link
            .get_or_insert_with(|| SerialLink::new(Arc::clone(connector), settings.clone()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection_state())
            .field("logging", &self.logging_state())
            .field("samples", &self.shared.series.len())
            .finish_non_exhaustive()
    }
}
