//! Benchmarks for the transport codec and chunk stores

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lakhash_store::{ChunkStore, Chunker, MemoryChunkStore};

fn generate_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let chunker = Chunker::new();

    for size in [16 * 1024, 1024 * 1024, 5 * 1024 * 1024].iter() {
        let data = generate_data(*size);
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("split", size), &data, |b, data| {
            b.iter(|| black_box(chunker.split(data)))
        });

        let chunks = chunker.split(&data);
        group.bench_with_input(BenchmarkId::new("join_exact", size), &chunks, |b, chunks| {
            b.iter(|| black_box(chunker.join_exact(chunks, *size as u64).unwrap()))
        });
    }

    group.finish();
}

fn bench_memory_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_store");
    let chunks = Chunker::new().split(&generate_data(1024 * 1024));

    group.throughput(Throughput::Bytes(1024 * 1024));
    group.bench_function("put_all_chunks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = MemoryChunkStore::new();
                for (index, chunk) in chunks.iter().enumerate() {
                    store.put_chunk("bench", index as u32, chunk.clone()).await.unwrap();
                }
                black_box(store.chunk_len())
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_memory_store);
criterion_main!(benches);
