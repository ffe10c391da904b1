use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use docsim::embed::normalize;
use docsim::store::{collect, DocumentId, DocumentRecord};
use docsim::vector::FlatIndex;
use rand::Rng;

const DIMENSION: usize = 384;

fn random_unit_vector(rng: &mut impl Rng) -> Vec<f32> {
    let mut v: Vec<f32> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();
    normalize(&mut v);
    v
}

fn records(size: usize) -> Vec<DocumentRecord> {
    let mut rng = rand::thread_rng();
    (0..size)
        .map(|i| {
            DocumentRecord::new(DocumentId::new(i as u64), format!("doc{}", i), "")
                .with_vector(&random_unit_vector(&mut rng))
        })
        .collect()
}

/// Benchmark the per-request snapshot: decode + index build
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_and_build");

    for size in [100, 1000, 10_000].iter() {
        let records = records(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let index = FlatIndex::build(collect(&records, DIMENSION)).unwrap();
                criterion::black_box(index);
            });
        });
    }
    group.finish();
}

/// Benchmark exact top-k search over a built index
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");
    let mut rng = rand::thread_rng();

    for size in [100, 1000, 10_000].iter() {
        let index = FlatIndex::build(collect(&records(*size), DIMENSION)).unwrap().unwrap();
        let query = random_unit_vector(&mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let hits = index.search(&query, 5).unwrap();
                criterion::black_box(hits.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
