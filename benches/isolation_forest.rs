use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydro_anomaly::anomaly::{AnomalyDetector, IsolationForest};
use hydro_anomaly::features::N_FEATURES;
use ndarray::Array2;
use rand::prelude::*;

fn create_readings(n_rows: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    Array2::from_shape_fn((n_rows, N_FEATURES), |_| rng.gen::<f64>() * 100.0)
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation_forest_fit");
    group.sample_size(10);

    for n_rows in [1000, 10000, 50000].iter() {
        let x = create_readings(*n_rows);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &x, |b, x| {
            b.iter(|| {
                let mut forest = IsolationForest::new()
                    .with_contamination(0.05)
                    .with_seed(42);
                forest.fit(black_box(x)).unwrap();
                forest
            })
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation_forest_score");

    let train = create_readings(10000);
    let mut forest = IsolationForest::new()
        .with_contamination(0.05)
        .with_seed(42);
    forest.fit(&train).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let x = create_readings(*n_rows);

        group.bench_with_input(BenchmarkId::new("score_samples", n_rows), &x, |b, x| {
            b.iter(|| forest.score_samples(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_score);
criterion_main!(benches);
