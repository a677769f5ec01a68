//! Shared time-series buffer
//!
//! [`TimeSeriesBuffer`] is a cheaply cloneable handle to the samples collected
//! since the last reset. The ingest thread is the only writer; the chart
//! refresh, label refresh and persistence paths read through snapshots.
//!
//! Every append happens under the write lock, so a snapshot taken under the
//! read lock is always a consistent prefix of the sequence: it never contains
//! a half-written sample and never contains a sample appended after the
//! snapshot call returned.
//!
//! Consumers outside the ingest path get a [`SeriesView`], which can read
//! but not modify the series.
//!
//! Growth is unbounded for the life of a session. That is fine for
//! bounded-duration logging runs, and it is the reason persistence cost grows
//! with session length (see [`crate::persist`]).

use crate::error::{Result, ThermoLogError};
use crate::types::Sample;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Append-only, time-ordered store of samples
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuffer {
    samples: Arc<RwLock<Vec<Sample>>>,
}

impl TimeSeriesBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample
    ///
    /// Rejects a sample whose timestamp is earlier than the last one.
    pub fn append(&self, sample: Sample) -> Result<()> {
        let mut samples = self.write();
        if let Some(last) = samples.last() {
            if sample.elapsed_seconds() < last.elapsed_seconds() {
                return Err(ThermoLogError::OutOfOrder {
                    last: last.elapsed_seconds(),
                    got: sample.elapsed_seconds(),
                });
            }
        }
        samples.push(sample);
        Ok(())
    }

    /// Copy of the whole series
    pub fn snapshot_all(&self) -> Vec<Sample> {
        self.read().clone()
    }

    /// Copy of the last `n` samples, oldest first
    pub fn snapshot_tail(&self, n: usize) -> Vec<Sample> {
        let samples = self.read();
        let start = samples.len().saturating_sub(n);
        samples[start..].to_vec()
    }

    /// Most recent sample
    pub fn last(&self) -> Option<Sample> {
        self.read().last().copied()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Read-only handle to the same samples
    pub fn view(&self) -> SeriesView {
        SeriesView {
            buffer: self.clone(),
        }
    }

    /// Discard all samples
    ///
    /// The session only calls this while no ingest thread is running.
    pub(crate) fn reset(&self) {
        self.write().clear();
    }

    // A panic while holding the lock cannot leave a torn sample behind
    // (push is the only mutation), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Sample>> {
        self.samples.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Sample>> {
        self.samples.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read-only handle to a [`TimeSeriesBuffer`]
///
/// A view cannot change the series:
///
/// ```compile_fail
/// use thermolog::{Sample, TimeSeriesBuffer};
///
/// let view = TimeSeriesBuffer::new().view();
/// view.append(Sample::new(0.0, [0.0; 4])).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SeriesView {
    buffer: TimeSeriesBuffer,
}

impl SeriesView {
    /// Copy of the whole series
    pub fn snapshot_all(&self) -> Vec<Sample> {
        self.buffer.snapshot_all()
    }

    /// Copy of the last `n` samples, oldest first
    pub fn snapshot_tail(&self, n: usize) -> Vec<Sample> {
        self.buffer.snapshot_tail(n)
    }

    /// Most recent sample
    pub fn last(&self) -> Option<Sample> {
        self.buffer.last()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn sample(t: f64) -> Sample {
        Sample::new(t, [t, t + 1.0, t + 2.0, t + 3.0])
    }

    #[test]
    fn test_append_and_snapshot() {
        let buffer = TimeSeriesBuffer::new();
        assert!(buffer.is_empty());

        buffer.append(sample(0.0)).unwrap();
        buffer.append(sample(0.5)).unwrap();
        buffer.append(sample(0.5)).unwrap();

        let all = buffer.snapshot_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].elapsed_seconds(), 0.5);
        assert_eq!(buffer.last(), Some(sample(0.5)));
    }

    #[test]
    fn test_append_rejects_older_timestamp() {
        let buffer = TimeSeriesBuffer::new();
        buffer.append(sample(2.0)).unwrap();
        let err = buffer.append(sample(1.0)).unwrap_err();
        assert!(matches!(err, ThermoLogError::OutOfOrder { .. }));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_snapshot_tail() {
        let buffer = TimeSeriesBuffer::new();
        assert!(buffer.snapshot_tail(50).is_empty());

        for i in 0..10 {
            buffer.append(sample(i as f64)).unwrap();
        }

        let tail = buffer.snapshot_tail(3);
        let times: Vec<_> = tail.iter().map(|s| s.elapsed_seconds()).collect();
        assert_eq!(times, [7.0, 8.0, 9.0]);

        assert_eq!(buffer.snapshot_tail(50).len(), 10);
        assert!(buffer.snapshot_tail(0).is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let buffer = TimeSeriesBuffer::new();
        buffer.append(sample(0.0)).unwrap();
        let snapshot = buffer.snapshot_all();
        buffer.append(sample(1.0)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_reset() {
        let buffer = TimeSeriesBuffer::new();
        buffer.append(sample(3.0)).unwrap();
        buffer.reset();
        assert!(buffer.is_empty());
        // After a reset the clock may start again from zero
        buffer.append(sample(0.0)).unwrap();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_view_tracks_buffer() {
        let buffer = TimeSeriesBuffer::new();
        let view = buffer.view();
        assert!(view.is_empty());

        buffer.append(sample(0.0)).unwrap();
        buffer.append(sample(1.0)).unwrap();

        assert_eq!(view.len(), 2);
        assert_eq!(view.last(), Some(sample(1.0)));
        assert_eq!(view.snapshot_tail(1), [sample(1.0)]);
        assert_eq!(view.snapshot_all(), buffer.snapshot_all());

        buffer.reset();
        assert!(view.is_empty());
    }

    #[test]
    fn test_concurrent_readers_see_prefixes() {
        let buffer = TimeSeriesBuffer::new();
        let writer = buffer.clone();

        let producer = thread::spawn(move || {
            for i in 0..1000 {
                writer.append(sample(i as f64 * 0.01)).unwrap();
            }
        });

        let mut last_len = 0;
        while !producer.is_finished() {
            let snapshot = buffer.snapshot_all();
            assert!(snapshot.len() >= last_len, "snapshots must only grow");
            for (i, s) in snapshot.iter().enumerate() {
                assert_eq!(s, &sample(i as f64 * 0.01));
            }
            last_len = snapshot.len();
        }
        producer.join().unwrap();
        assert_eq!(buffer.len(), 1000);
    }

    proptest! {
        #[test]
        fn test_tail_is_suffix_of_all(
            count in 0usize..200,
            n in 0usize..80
        ) {
            let buffer = TimeSeriesBuffer::new();
            for i in 0..count {
                buffer.append(sample(i as f64)).unwrap();
            }
            let all = buffer.snapshot_all();
            let tail = buffer.snapshot_tail(n);
            prop_assert_eq!(tail.len(), n.min(count));
            prop_assert_eq!(&all[all.len() - tail.len()..], &tail[..]);
        }
    }
}
