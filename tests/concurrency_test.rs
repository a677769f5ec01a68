//! Concurrent reader/writer tests for the time series

mod common;

use common::builders::{flat_sample, line};
use common::mock_helpers::fed_session;
use common::wait_until;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use thermolog::presentation::ChartWindow;
use thermolog::TimeSeriesBuffer;

#[test]
fn test_tail_reader_during_appends() {
    let buffer = TimeSeriesBuffer::new();
    let done = Arc::new(AtomicBool::new(false));
    let snapshots = Arc::new(AtomicUsize::new(0));

    let reader = {
        let series = buffer.view();
        let done = Arc::clone(&done);
        let snapshots = Arc::clone(&snapshots);
        thread::spawn(move || {
            let mut partial = 0;
            while !done.load(Ordering::SeqCst) {
                let len = series.len();
                let tail = series.snapshot_tail(50);
                assert!(tail.len() <= 50);
                assert!(tail.len() >= len.min(50));
                assert!(tail
                    .windows(2)
                    .all(|w| w[0].elapsed_seconds() <= w[1].elapsed_seconds()));
                // Every sample is whole: all channels carry the stamp
                assert!(tail.iter().all(|s| s.values().iter().all(|&v| v == s.elapsed_seconds())));
                if len > 0 && len < 1000 {
                    partial += 1;
                }
                snapshots.fetch_add(1, Ordering::SeqCst);
            }
            partial
        })
    };

    for i in 0..1000 {
        buffer.append(flat_sample(i as f64 * 0.001)).unwrap();
        // Let the reader in between batches
        if (i + 1) % 100 == 0 {
            let seen = snapshots.load(Ordering::SeqCst);
            wait_until("reader snapshot", || snapshots.load(Ordering::SeqCst) > seen + 1);
        }
    }
    done.store(true, Ordering::SeqCst);

    let partial = reader.join().unwrap();
    assert!(partial > 0, "no snapshot overlapped the appends");
    assert_eq!(buffer.len(), 1000);
    assert_eq!(buffer.snapshot_tail(50).len(), 50);
}

#[test]
fn test_chart_reads_while_ingest_runs() {
    let (mut session, feed) = fed_session();
    session.start().unwrap();

    let series = session.series();
    let chart_reader = thread::spawn(move || {
        let mut longest = 0;
        while longest < 200 {
            let window = ChartWindow::from_samples(&series.snapshot_tail(50));
            assert!(window.len() <= 50);
            assert!(window
                .seconds()
                .windows(2)
                .all(|w| w[0] <= w[1]));
            longest = series.len();
        }
    });

    for i in 0..200 {
        feed.send(line([i as f64; 4])).unwrap();
    }
    chart_reader.join().unwrap();
    wait_until("all samples", || session.stats().samples_committed == 200);
    session.stop_and_join();

    let samples = session.series().snapshot_all();
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.values(), &[i as f64; 4]);
    }
}
