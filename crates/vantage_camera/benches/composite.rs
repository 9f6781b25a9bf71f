//! Stack composition benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vantage_camera::prelude::*;
use vantage_camera::{composite, CompositeLayer};

fn layers(count: usize) -> Vec<CompositeLayer> {
    (0..count)
        .map(|i| {
            let x = i as f32;
            let location = CameraLocation::looking_at(Vec3::new(x, 2.0, 8.0), Vec3::new(x, 0.0, 0.0));
            let mut layer = CompositeLayer::new(CameraId::FIXED, location, 0.5);
            if i % 4 == 3 {
                layer.distance_weight = Some(0.5);
            }
            if i % 5 == 4 {
                layer.circular = Some(true);
            }
            layer
        })
        .collect()
}

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");
    for count in [2, 8, 32] {
        let stack = layers(count);
        group.bench_function(format!("{count}_layers"), |b| {
            b.iter(|| composite(black_box(&stack)))
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let cameras = match CameraContext::builtin(CameraManagerConfig::shipping()) {
        Ok(cameras) => cameras,
        Err(err) => panic!("failed to create camera context: {err}"),
    };
    for i in 0..6 {
        let start = CameraStartInfo::new()
            .with_locator(Locator::looking_at(Vec3::new(i as f32, 2.0, 8.0), Vec3::ZERO));
        cameras.request_camera(CameraId::FIXED, Some(CameraBlendInfo::seconds(100.0)), Some(start));
    }

    c.bench_function("context_update", |b| {
        b.iter(|| cameras.update(black_box(&FrameInput::new(1.0 / 60.0))))
    });
}

criterion_group!(benches, bench_composite, bench_update);
criterion_main!(benches);
