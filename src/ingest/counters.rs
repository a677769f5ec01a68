//! Lock-free counters updated by the ingest thread

use crate::types::IngestStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ingest health counters
#[derive(Debug, Default)]
pub struct IngestCounters {
    lines_read: AtomicU64,
    samples_committed: AtomicU64,
    decode_errors: AtomicU64,
    timeouts: AtomicU64,
    dropped_events: AtomicU64,
}

impl IngestCounters {
    pub fn line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample_committed(&self) {
        self.samples_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dropped(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into a stats value
    ///
    /// Persistence fields are left at their defaults; the sink owns those.
    pub fn snapshot(&self) -> IngestStats {
        IngestStats {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            samples_committed: self.samples_committed.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            ..IngestStats::default()
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.lines_read,
            &self.samples_committed,
            &self.decode_errors,
            &self.timeouts,
            &self.dropped_events,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
