use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kisaan_connect::analysis::{analyze_batch, BatchSample};
use kisaan_connect::{Crop, SoilMeasurement, SoilScoringEngine};

fn samples(n: usize) -> Vec<BatchSample> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            BatchSample {
                label: format!("Sample {}", i + 1),
                measurement: SoilMeasurement::new(
                    5.0 + (f % 40.0) / 10.0,
                    80.0 + f % 200.0,
                    5.0 + f % 45.0,
                    40.0 + f % 220.0,
                )
                .with_organic_carbon(0.2 + (f % 8.0) / 10.0),
                crop: Some(if i % 2 == 0 { Crop::Wheat } else { Crop::Cotton }),
            }
        })
        .collect()
}

fn bench_score_health(c: &mut Criterion) {
    let engine = SoilScoringEngine::default();
    let m = SoilMeasurement::new(6.4, 180.0, 22.0, 110.0)
        .with_organic_carbon(0.45)
        .with_conductivity(2.3);

    c.bench_function("engine.score_health", |b| {
        b.iter(|| engine.score_health(black_box(&m)))
    });

    c.bench_function("engine.classify_crop_suitability.estimated", |b| {
        b.iter(|| engine.classify_crop_suitability(black_box(&m), &Crop::Sugarcane, &[]))
    });
}

fn bench_batch(c: &mut Criterion) {
    let engine = SoilScoringEngine::default();
    let batch = samples(1_000);

    c.bench_function("analysis.analyze_batch.1000", |b| {
        b.iter(|| analyze_batch(&engine, black_box(&batch)))
    });
}

criterion_group!(benches, bench_score_health, bench_batch);
criterion_main!(benches);
