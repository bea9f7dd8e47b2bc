use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flash_storage::Storage;
use std::hint::black_box;
use tempfile::TempDir;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn bench_path_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_resolution");

    let temp = TempDir::new().unwrap();
    let rt = runtime();
    let storage = rt.block_on(async { Storage::builder().root(temp.path()).connect().await.unwrap() });

    group.bench_function("flat", |b| {
        b.iter(|| black_box(storage.resolve("auth.bin").unwrap()));
    });

    group.bench_function("nested", |b| {
        b.iter(|| black_box(storage.resolve("node/./mainnet/../testnet/auth.bin").unwrap()));
    });

    group.finish();
}

fn bench_atomic_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic_write");
    group.sample_size(20);

    let temp = TempDir::new().unwrap();
    let rt = runtime();
    let storage = rt.block_on(async { Storage::builder().root(temp.path()).connect().await.unwrap() });

    for (name, size) in [("4KB", 4 * 1024usize), ("256KB", 256 * 1024)] {
        let data = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(u64::try_from(size).unwrap_or(u64::MAX)));

        group.bench_with_input(BenchmarkId::new("write", name), &data, |b, data| {
            b.to_async(&rt).iter(|| async { storage.write("auth.bin", data).await.unwrap() });
        });

        group.bench_with_input(BenchmarkId::new("read", name), &data, |b, _| {
            b.to_async(&rt).iter(|| async { black_box(storage.read("auth.bin").await.unwrap()) });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_path_resolution, bench_atomic_write);
criterion_main!(benches);
