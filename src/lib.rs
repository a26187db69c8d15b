#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Removal Library
//!
//! Removes the background of a photo with a salient-object segmentation model
//! (U2-Net style) and returns the same image with a foreground alpha channel.
//!
//! Each call runs a fixed pipeline:
//!
//! 1. keep the original RGBA image and stretch a working copy to the model input size
//! 2. pack the working copy into a normalized `[1, 3, H, W]` tensor
//! 3. run the model through an [`InferenceBackend`]
//! 4. turn the output into an 8-bit mask and stretch it back to the original size
//! 5. write the mask into the alpha channel, leaving red, green and blue untouched
//!
//! ## Features
//!
//! - **Multiple Backends**: ONNX Runtime (CPU or CUDA) and Tract (pure Rust)
//! - **Any Model Geometry**: input/output sizes and input name are configurable
//! - **Thread Safe**: one [`BackgroundRemover`] serves concurrent calls
//! - **CLI Integration**: optional `remove-background` binary (`cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remove_background::{
//!     BackgroundRemover, ExecutionTarget, ImageIOService, ModelConfig, PipelineConfig,
//!     TransparentColorMode,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = PipelineConfig::builder()
//!     .model(ModelConfig::square(320, "input_image"))
//!     .execution_target(ExecutionTarget::Default)
//!     .build()?;
//! let remover = BackgroundRemover::new("u2netp.onnx", config)?;
//!
//! let result = remover.remove_background_from_path("input.jpg")?;
//! ImageIOService::save_png(&result, "output.png", TransparentColorMode::Clear)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend with CUDA support
//! - `tract` (default): pure Rust backend, CPU only
//! - `cli` (default): command line interface and progress reporting
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! remove-background = { version = "0.1", default-features = false, features = ["tract"] }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod inference;
pub mod mask;
pub mod models;
pub mod packer;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod utils;

// Public API exports
pub use backends::*;
pub use compositor::Compositor;
pub use config::{
    BackendType, ExecutionTarget, ModelConfig, PipelineConfig, PipelineConfigBuilder,
};
pub use error::{BgRemovalError, Result};
pub use inference::InferenceBackend;
pub use mask::MaskBuilder;
pub use models::ModelSource;
pub use packer::TensorPacker;
pub use processor::{BackendFactory, BackgroundRemover, DefaultBackendFactory, ProcessingStage};
pub use services::{ImageIOService, TransparentColorMode};
pub use utils::{StretchResize, TensorValidator};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};
