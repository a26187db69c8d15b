use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use ndarray::{ArrayD, IxDyn};
use remove_background::{
    BackgroundRemover, Compositor, MaskBuilder, MockBackend, ModelConfig, PipelineConfig,
    StretchResize, TensorPacker,
};

fn test_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn bench_stages(c: &mut Criterion) {
    let model = ModelConfig::default();
    let policy = StretchResize::default();
    let source = test_image(1024, 768);

    let mut group = c.benchmark_group("stages");

    group.bench_function("resize_to_model_input", |b| {
        b.iter(|| policy.resize(black_box(&source), model.input_width, model.input_height));
    });

    let working = policy.resize(&source, model.input_width, model.input_height);
    group.bench_function("pack", |b| {
        b.iter(|| TensorPacker::pack(black_box(&working)));
    });

    let output = ArrayD::from_elem(IxDyn(&[1, 1, 320, 320]), 0.75_f32);
    group.bench_function("build_mask", |b| {
        b.iter(|| MaskBuilder::build(black_box(&output), &model, (1024, 768), &policy));
    });

    let mask = GrayImage::from_pixel(1024, 768, Luma([128]));
    group.bench_function("composite", |b| {
        b.iter(|| Compositor::composite(black_box(source.clone()), &mask));
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let model = ModelConfig::default();
    let config = PipelineConfig::builder().model(model.clone()).build().unwrap();
    let remover =
        BackgroundRemover::with_backend(Box::new(MockBackend::constant(&model, 1.0)), config)
            .unwrap();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    for (width, height) in [(320, 320), (800, 600), (1920, 1080)] {
        let source = test_image(width, height);
        group.bench_with_input(
            BenchmarkId::new("remove_background", format!("{width}x{height}")),
            &source,
            |b, source| {
                b.iter(|| remover.remove_background(black_box(source.clone())));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_pipeline);
criterion_main!(benches);
