use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tempfile::TempDir;

use logbatch::{
    core::{analytics::server_counts, buffer::IngestionBuffer},
    persist::{DurableStore, recovery::RecoveryFile, sqlite::SqliteStore},
    record::{LogRecord, RawRecord},
    types::{QUERY_LIMIT, Severity},
};

fn raw(i: u64) -> RawRecord {
    RawRecord::new(format!("request {i} served in {}ms", i % 250), format!("web-{}", i % 8))
}

fn bench_accept(c: &mut Criterion) {
    let mut group = c.benchmark_group("accept_1k");
    for threshold in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(threshold), &threshold, |b, &t| {
            b.iter(|| {
                let tmp = TempDir::new().expect("tmp");
                let mut store = SqliteStore::open_in_memory().expect("open sqlite");
                let mut buffer =
                    IngestionBuffer::new(RecoveryFile::new(tmp.path().join("buffer.json")), t);
                for i in 0..1_000u64 {
                    let _ = buffer.accept(raw(i), &mut store).expect("accept");
                }
            });
        });
    }
    group.finish();
}

fn bench_recent_query(c: &mut Criterion) {
    let mut store = SqliteStore::open_in_memory().expect("open sqlite");
    let now = chrono::Utc::now();
    let records: Vec<_> = (0..50_000i64)
        .map(|i| {
            LogRecord::new(
                format!("line {i}"),
                format!("web-{}", i % 8),
                Severity::Info,
                now + chrono::Duration::milliseconds(i),
            )
            .expect("record")
        })
        .collect();
    for chunk in records.chunks(1_000) {
        store.write_batch(chunk).expect("write");
    }

    c.bench_function("recent_100_with_counts", |b| {
        b.iter(|| {
            let recent = store.recent(QUERY_LIMIT).expect("recent");
            let _ = server_counts(&recent);
        });
    });
}

criterion_group!(benches, bench_accept, bench_recent_query);
criterion_main!(benches);
