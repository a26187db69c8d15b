//! One remover shared by many threads

use image::{Rgba, RgbaImage};
use remove_background::{BackgroundRemover, MockBackend, ModelConfig, PipelineConfig};
use std::sync::Arc;
use std::thread;

#[test]
fn test_parallel_calls_share_one_backend() {
    let model = ModelConfig::square(4, "input_image");
    let mock = Arc::new(MockBackend::constant(&model, 1.0));
    let config = PipelineConfig::builder().model(model).build().unwrap();
    let remover =
        Arc::new(BackgroundRemover::with_backend(Box::new(Arc::clone(&mock)), config).unwrap());

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let remover = Arc::clone(&remover);
            thread::spawn(move || {
                let size = 5 + u32::from(i);
                let color = Rgba([i * 30, 255 - i * 30, i, 255]);
                let result = remover
                    .remove_background(RgbaImage::from_pixel(size, size + 1, color))
                    .unwrap();
                (size, color, result)
            })
        })
        .collect();

    for handle in handles {
        let (size, color, result) = handle.join().unwrap();
        assert_eq!(result.dimensions(), (size, size + 1));
        assert!(result.pixels().all(|p| p.0 == color.0));
    }

    assert_eq!(mock.calls(), 8);
    assert_eq!(mock.last_input_name().as_deref(), Some("input_image"));
}

#[test]
fn test_remover_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BackgroundRemover>();
}
