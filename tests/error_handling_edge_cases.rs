//! Error taxonomy and failure isolation
//!
//! Construction failures are configuration errors; everything that goes wrong
//! while processing one image is scoped to that call.

use image::{Rgba, RgbaImage};
use ndarray::{ArrayD, IxDyn};
use remove_background::{
    BackgroundRemover, BgRemovalError, ExecutionTarget, ImageIOService, MockBackend, ModelConfig,
    ModelSource, PipelineConfig, TransparentColorMode,
};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_nonexistent_model_path_fails_at_construction() {
    let result = BackgroundRemover::new("/nonexistent/u2net.onnx", PipelineConfig::default());

    let err = result.unwrap_err();
    assert!(matches!(err, BgRemovalError::Configuration(_)));
    assert!(err.is_configuration());
    assert!(!err.is_per_call());
    assert!(err.to_string().contains("Could not find model"));
}

#[test]
fn test_empty_model_bytes_fail_at_construction() {
    let err = BackgroundRemover::new(ModelSource::Bytes(Vec::new()), PipelineConfig::default())
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_corrupt_model_fails_at_construction() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let model_path = temp_dir.path().join("broken.onnx");
    std::fs::write(&model_path, b"this is not an onnx graph")?;

    let err = BackgroundRemover::new(model_path.as_path(), PipelineConfig::default()).unwrap_err();
    assert!(err.is_configuration(), "unexpected error: {err}");
    Ok(())
}

#[cfg(feature = "tract")]
#[test]
fn test_tract_rejects_accelerated_target() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let model_path = temp_dir.path().join("model.onnx");
    std::fs::write(&model_path, b"placeholder")?;

    let config = PipelineConfig::builder()
        .backend_type(remove_background::BackendType::Tract)
        .execution_target(ExecutionTarget::Accelerated(0))
        .build()?;

    let err = BackgroundRemover::new(model_path.as_path(), config).unwrap_err();
    assert!(err.is_configuration());
    Ok(())
}

#[test]
fn test_zero_dimension_model_config_is_rejected() {
    let result = PipelineConfig::builder()
        .model(ModelConfig {
            input_width: 0,
            ..ModelConfig::default()
        })
        .build();
    assert!(result.unwrap_err().is_configuration());
}

#[test]
fn test_unusable_output_does_not_poison_the_remover() {
    let model = ModelConfig::square(2, "input_image");
    // Bright images get a tensor too small to hold the mask
    let backend = MockBackend::from_fn(|input| {
        if input[[0, 0, 0, 0]] > 0.5 {
            ArrayD::from_elem(IxDyn(&[1, 1, 1, 1]), 1.0)
        } else {
            ArrayD::from_elem(IxDyn(&[1, 1, 2, 2]), 1.0)
        }
    });
    let config = PipelineConfig::builder().model(model).build().unwrap();
    let remover = BackgroundRemover::with_backend(Box::new(backend), config).unwrap();

    let err = remover
        .remove_background(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])))
        .unwrap_err();
    assert!(matches!(err, BgRemovalError::UnusableOutput(_)));
    assert!(err.is_per_call());

    let ok = remover
        .remove_background(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])))
        .unwrap();
    assert!(ok.pixels().all(|p| p.0 == [0, 0, 0, 255]));
}

#[test]
fn test_missing_output_is_unusable_output() {
    let config = PipelineConfig::builder()
        .model(ModelConfig::square(2, "input_image"))
        .build()
        .unwrap();
    let remover =
        BackgroundRemover::with_backend(Box::new(MockBackend::no_output()), config).unwrap();

    for _ in 0..2 {
        let err = remover.segment(&RgbaImage::new(3, 3)).unwrap_err();
        assert!(matches!(err, BgRemovalError::UnusableOutput(_)));
    }
}

#[test]
fn test_unreadable_input_file_is_per_call() -> anyhow::Result<()> {
    let model = ModelConfig::square(2, "input_image");
    let mock = Arc::new(MockBackend::constant(&model, 1.0));
    let config = PipelineConfig::builder().model(model).build()?;
    let remover = BackgroundRemover::with_backend(Box::new(Arc::clone(&mock)), config)?;

    let temp_dir = TempDir::new()?;
    let garbage = temp_dir.path().join("garbage.png");
    std::fs::write(&garbage, b"not a png")?;

    let err = remover.remove_background_from_path(&garbage).unwrap_err();
    assert!(err.is_per_call());

    let err = remover
        .remove_background_from_path(temp_dir.path().join("missing.png"))
        .unwrap_err();
    assert!(matches!(err, BgRemovalError::Io(_)));

    // Decoding failures never reach the backend
    assert_eq!(mock.calls(), 0);
    Ok(())
}

#[test]
fn test_path_and_bytes_entry_points_agree() -> anyhow::Result<()> {
    let model = ModelConfig::square(2, "input_image");
    let config = PipelineConfig::builder().model(model.clone()).build()?;
    let remover =
        BackgroundRemover::with_backend(Box::new(MockBackend::constant(&model, 0.0)), config)?;

    let source = RgbaImage::from_pixel(6, 3, Rgba([10, 200, 30, 255]));
    let encoded = ImageIOService::encode_png(&source, TransparentColorMode::Preserve)?;

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("source.png");
    std::fs::write(&path, &encoded)?;

    let from_path = remover.remove_background_from_path(&path)?;
    let from_bytes = remover.remove_background_from_bytes(&encoded)?;
    let from_image =
        remover.remove_background_from_image(&image::DynamicImage::ImageRgba8(source))?;

    assert_eq!(from_path, from_bytes);
    assert_eq!(from_bytes, from_image);
    assert!(from_path.pixels().all(|p| p.0 == [10, 200, 30, 0]));
    Ok(())
}
