//! Tracker benchmarks using Criterion.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use seaguard_rs::filter::FilterFactoryEnum;
use seaguard_rs::{
    AlertParams, Detection, DriftEstimator, FrameSize, LumaFrame, Observation, PostureEstimate, Tracker,
    TrackerConfig,
};

const FRAME: FrameSize = FrameSize { width: 1920.0, height: 1080.0 };

/// Create test detections laid out on a grid, shifted by `frame` pixels.
fn create_test_detections(n: usize, frame: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = ((i % 20) * 90 + frame) as f64;
            let y = ((i / 20) * 150) as f64;
            Detection::from_xywh([x, y, 40.0, 80.0], 0.9)
        })
        .collect()
}

fn create_test_postures(detections: &[Detection]) -> Vec<PostureEstimate> {
    detections
        .iter()
        .step_by(3)
        .map(|d| {
            let c = d.centroid();
            PostureEstimate::new([c.x, c.y], 0.7)
        })
        .collect()
}

fn bench_tracker(c: &mut Criterion, name: &str, n: usize, config: TrackerConfig) {
    let mut tracker = Tracker::new(config).expect("valid tracker");
    let frames: Vec<Vec<Detection>> = (0..10).map(|f| create_test_detections(n, f)).collect();
    let postures: Vec<Vec<PostureEstimate>> = frames.iter().map(|d| create_test_postures(d)).collect();
    let params = AlertParams::default();
    let mut tick = 0usize;

    c.bench_function(name, |b| {
        b.iter(|| {
            let i = tick % frames.len();
            let obs = Observation::new(tick as f64 / 30.0, FRAME, &frames[i]);
            tracker.update(black_box(&obs), black_box(&postures[i]), &params);
            black_box(tracker.drain_events());
            tick += 1;
        })
    });
}

fn benchmark_tracker_update_10_people(c: &mut Criterion) {
    bench_tracker(c, "tracker_update_10_people", 10, TrackerConfig::default());
}

fn benchmark_tracker_update_50_people(c: &mut Criterion) {
    bench_tracker(c, "tracker_update_50_people", 50, TrackerConfig::default());
}

fn benchmark_tracker_update_100_people_no_filter(c: &mut Criterion) {
    let mut config = TrackerConfig::default();
    config.filter_factory = FilterFactoryEnum::None;
    bench_tracker(c, "tracker_update_100_people_no_filter", 100, config);
}

fn benchmark_drift_estimate(c: &mut Criterion) {
    let texture = |x: usize, y: usize| ((x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)) >> 7) as u8;
    let prev = LumaFrame::from_fn(640, 360, texture);
    let curr = LumaFrame::from_fn(640, 360, |x, y| texture(x + 3, y + 1));
    let estimator = DriftEstimator::new();

    c.bench_function("drift_estimate_640x360", |b| {
        b.iter(|| estimator.estimate(black_box(&prev), black_box(&curr), 1.0 / 30.0, None))
    });
}

criterion_group!(
    benches,
    benchmark_tracker_update_10_people,
    benchmark_tracker_update_50_people,
    benchmark_tracker_update_100_people_no_filter,
    benchmark_drift_estimate,
);

criterion_main!(benches);
