//! Benchmarks for splat-render frame composition.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use splat_core::{
    CanvasId, Flags, HeadlessUploader, ManualClock, PixelSurface, Point, Scene, TexRegion,
};
use splat_render::frame;
use splat_render::vertex::CameraUniform;

const VIEWPORT: (u32, u32) = (640, 480);

/// Scene with `n` instances spread over 8 layers and 4 images, a mix of
/// plain, relative, mirrored and rotated sprites.
fn make_scene(n: usize) -> (Scene, CanvasId) {
    let mut scene = Scene::with_clock(ManualClock::new(0));
    let mut uploader = HeadlessUploader::new();
    let canvas = scene.create_canvas();

    let pixels = vec![0xFF; 32 * 32 * 4];
    let images: Vec<_> = (0..4)
        .map(|_| {
            scene
                .create_image(canvas, &PixelSurface::rgba(32, 32, &pixels), &mut uploader)
                .unwrap()
        })
        .collect();
    let layers: Vec<_> = (0..8)
        .map(|_| scene.create_layer(canvas, None).unwrap())
        .collect();

    for i in 0..n {
        let flags = match i % 4 {
            0 => Flags::empty(),
            1 => Flags::RELATIVE,
            2 => Flags::MIRROR_X | Flags::MIRROR_DIAG,
            _ => Flags::ROTATE,
        };
        let inst = scene
            .create_instance(
                images[i % images.len()],
                layers[(i / 64) % layers.len()],
                ((i * 37) % 1200) as i32,
                ((i * 53) % 900) as i32,
                TexRegion::new(0.0, 0.0, 0.5, 0.5),
                flags.bits(),
            )
            .unwrap();
        scene.set_instance_angle(inst, (i % 360) as f32).unwrap();
    }

    for i in 0..16 {
        scene
            .draw_debug_line(
                canvas,
                Point::new(i * 10, 0),
                Point::new(i * 10, 100),
                [1.0, 0.0, 0.0, 1.0],
                2,
                0,
                1_000,
            )
            .unwrap();
    }

    (scene, canvas)
}

fn bench_frame_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_build");
    for &count in &[100, 1_000, 10_000] {
        let (scene, canvas) = make_scene(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &scene, |b, scene| {
            b.iter(|| {
                black_box(frame::build(black_box(scene), canvas, VIEWPORT, 0).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_camera_orthographic(c: &mut Criterion) {
    c.bench_function("CameraUniform::orthographic", |b| {
        b.iter(|| {
            black_box(CameraUniform::orthographic(
                black_box(640.0),
                black_box(480.0),
                black_box(2.0),
                black_box(2.0),
            ));
        });
    });
}

criterion_group!(benches, bench_frame_build, bench_camera_orthographic);
criterion_main!(benches);
