//! Benchmarks for the ingest hot path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use thermolog::frame;
use thermolog::persist::write_csv;
use thermolog::presentation::ChartWindow;
use thermolog::{Sample, TimeSeriesBuffer};

fn filled_buffer(size: usize) -> TimeSeriesBuffer {
    let buffer = TimeSeriesBuffer::new();
    for i in 0..size {
        let t = i as f64 * 0.25;
        buffer
            .append(Sample::new(t, [20.0 + t.sin(), 21.0, 22.0 + t.cos(), 23.0]))
            .unwrap();
    }
    buffer
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    let lines = [
        ("valid", "23.45,24.10,22.98,25.00"),
        ("padded", "  23.45 , 24.10 , 22.98 , 25.00 \r"),
        ("field_count", "23.45,24.10,22.98"),
        ("not_numeric", "23.45,abc,22.98,25.00"),
    ];

    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(frame::decode(black_box(line))))
        });
    }

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    c.bench_function("append_1000", |b| {
        b.iter(|| {
            let buffer = TimeSeriesBuffer::new();
            for i in 0..1000 {
                buffer
                    .append(Sample::new(i as f64, [1.0, 2.0, 3.0, 4.0]))
                    .unwrap();
            }
            black_box(buffer.len())
        })
    });
}

fn bench_snapshot_tail(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart_window");

    for size in [1_000, 10_000, 100_000] {
        let buffer = filled_buffer(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &buffer, |b, buffer| {
            b.iter(|| black_box(ChartWindow::from_samples(&buffer.snapshot_tail(50))))
        });
    }

    group.finish();
}

fn bench_full_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_rewrite");

    for size in [100, 1_000, 10_000] {
        let samples = filled_buffer(size).snapshot_all();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &samples, |b, samples| {
            b.iter(|| {
                let mut out = Vec::with_capacity(samples.len() * 40);
                write_csv(&mut out, samples).unwrap();
                black_box(out.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_append,
    bench_snapshot_tail,
    bench_full_rewrite
);
criterion_main!(benches);
