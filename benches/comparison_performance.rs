use criterion::{Criterion, black_box, criterion_group, criterion_main};
use deltalap::alignment::TrackAligner;
use deltalap::telemetry::{Lap, TelemetrySample, estimate_distance};
use deltalap::{ComparisonEngine, ComparisonOutcome};
use std::time::Duration;

/// ~5km lap sampled at 10Hz with a speed trace that brakes into a corner
/// every 30 seconds.
fn create_sample_lap(lap_number: u32, pace: f64) -> Lap {
    let samples = (0..1200)
        .map(|i| {
            let t = i as f64 / 10.;
            let phase = (t % 30.) / 30.;
            let speed = (90. + 140. * (phase * std::f64::consts::PI).sin()) * pace;
            let braking = phase > 0.85;
            TelemetrySample {
                time: t,
                speed: Some(speed),
                throttle: Some(if braking { 0. } else { 100. * phase.min(0.95) }),
                brake: Some(if braking { 80. } else { 0. }),
                gear: Some(2 + (speed / 45.) as u32),
                rpm: Some(4000. + speed * 30.),
                lateral_accel: Some(1.2 * (phase * 6.).sin()),
                steering_angle: Some(0.04 * (phase * 6.).sin()),
                water_temp: Some(88.),
                oil_temp: Some(104.),
                ..Default::default()
            }
        })
        .collect();
    Lap::from_samples(lap_number, samples)
}

fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("alignment");

    let lap1 = create_sample_lap(1, 1.);
    let lap2 = create_sample_lap(2, 0.98);

    group.bench_function("estimate_distance", |b| {
        b.iter(|| black_box(estimate_distance(&lap1).unwrap()));
    });

    let tagged1 = estimate_distance(&lap1).unwrap();
    let tagged2 = estimate_distance(&lap2).unwrap();
    let aligner = TrackAligner::default();
    group.bench_function("align_two_laps", |b| {
        b.iter(|| black_box(aligner.align(&tagged1, &tagged2).unwrap()));
    });

    group.finish();
}

fn bench_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("comparison");

    let lap1 = create_sample_lap(1, 1.);
    let lap2 = create_sample_lap(2, 0.98);
    let engine = ComparisonEngine::default();

    group.bench_function("compare_laps", |b| {
        b.iter(|| black_box(engine.compare_laps("Alice", &lap1, "Bob", &lap2).unwrap()));
    });

    let outcome = ComparisonOutcome::from(engine.compare_laps("Alice", &lap1, "Bob", &lap2));
    group.bench_function("serialize_report", |b| {
        b.iter(|| black_box(serde_json::to_string(&outcome).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_alignment, bench_comparison
}
criterion_main!(benches);
