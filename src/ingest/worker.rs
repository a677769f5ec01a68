//! Ingest thread implementation
//!
//! [`IngestLoop`] runs on its own thread for the duration of one logging run.
//! It owns the [`SerialLink`] exclusively and hands it back as the thread's
//! return value, so the session gets the link back by joining.
//!
//! # Loop body
//!
//! 1. Check the stop flag
//! 2. Read one line (blocks at most for the read timeout)
//! 3. Decode it and stamp it with the session clock
//! 4. Append to the series, update the latest values
//! 5. Rewrite the output file if saving is enabled
//!
//! Decode failures are counted and reported, never fatal. A closed link ends
//! the run.

use super::{IngestEvent, Shared};
use crate::link::{ReadOutcome, SerialLink};
use crate::types::Sample;
use crossbeam_channel::Sender;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// The producer side of a logging session
pub struct IngestLoop {
    /// Link owned for the duration of the run
    link: SerialLink,
    /// State shared with the session
    shared: Arc<Shared>,
    /// Session clock origin
    origin: Instant,
    /// Notifications to the foreground
    events: Sender<IngestEvent>,
}

impl IngestLoop {
    /// Create a loop over an open link
    pub(crate) fn new(
        link: SerialLink,
        shared: Arc<Shared>,
        origin: Instant,
        events: Sender<IngestEvent>,
    ) -> Self {
        Self {
            link,
            shared,
            origin,
            events,
        }
    }

    /// Run until stopped or the link closes, then return the link
    pub fn run(mut self) -> SerialLink {
        tracing::info!(
            "Ingest started on {}",
            self.link.port_name().unwrap_or("<closed>")
        );

        while !self.shared.stop.load(Ordering::SeqCst) {
            match self.link.read_line() {
                ReadOutcome::Line(line) => self.handle_line(line),
                ReadOutcome::Timeout => self.shared.counters.timeout(),
                ReadOutcome::Closed(reason) => {
                    self.shared.set_connection(self.link.state().clone());
                    self.try_send_event(IngestEvent::LinkClosed(reason));
                    break;
                }
            }
        }

        self.try_send_event(IngestEvent::Stopped);
        tracing::info!("Ingest stopped");
        self.link
    }

    fn handle_line(&mut self, line: String) {
        self.shared.counters.line_read();
        let elapsed = self.origin.elapsed().as_secs_f64();

        match Sample::decode(&line, elapsed) {
            Ok(sample) => self.commit(sample),
            Err(error) => {
                self.shared.counters.decode_error();
                tracing::debug!("Discarded line {:?}: {}", line, error);
                self.try_send_event(IngestEvent::DecodeFailed { line, error });
            }
        }
    }

    fn commit(&mut self, sample: Sample) {
        if let Err(e) = self.shared.series.append(sample) {
            tracing::warn!("Sample not appended: {}", e);
            return;
        }
        self.shared.update_latest(&sample);
        self.shared.counters.sample_committed();

        let persisted = {
            let mut sink = self.shared.lock_sink();
            let result = sink.on_sample_committed(&self.shared.series);
            self.shared.publish_sink(&sink);
            result
        };
        if let Err(e) = persisted {
            self.try_send_event(IngestEvent::PersistenceFailed(e.to_string()));
        }

        self.try_send_event(IngestEvent::SampleCommitted(sample));
    }

    /// Send an event without blocking; a full queue drops it
    fn try_send_event(&self, event: IngestEvent) {
        if self.events.try_send(event).is_err() {
            self.shared.counters.event_dropped();
        }
    }
}
