//! Background removal pipeline
//!
//! [`BackgroundRemover`] owns the loaded inference backend and runs the fixed
//! stage sequence for each image:
//!
//! ```text
//! Idle -> Loaded -> Resized -> Packed -> Inferred -> MaskBuilt -> Composited -> Done
//! ```
//!
//! Every call works on its own buffers; the backend and the model geometry are
//! read-only after construction, so one remover can serve calls from several
//! threads at once.

use crate::{
    compositor::Compositor,
    config::{BackendType, PipelineConfig},
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    mask::MaskBuilder,
    models::ModelSource,
    packer::TensorPacker,
    services::ImageIOService,
    utils::TensorValidator,
};
use image::{DynamicImage, GrayImage, RgbaImage};
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use tracing::{debug as trace_debug, info as trace_info, instrument, span, warn, Level};

/// Pipeline stage of a processing call
///
/// A call moves to a stage before doing that stage's work, so each variant
/// names the state the call is in once the work succeeds, and a failed call
/// reports the stage whose work it was attempting. `Display` prints that work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// No image accepted yet
    Idle,
    /// Taking the original snapshot
    Loaded,
    /// Stretching the working copy to the model input size
    Resized,
    /// Packing the working copy into the input tensor
    Packed,
    /// Running the model
    Inferred,
    /// Unpacking the output and rescaling it to the original size
    MaskBuilt,
    /// Merging the mask into the alpha channel
    Composited,
    /// Result handed back to the caller
    Done,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loaded => "loading",
            Self::Resized => "resizing",
            Self::Packed => "packing",
            Self::Inferred => "inference",
            Self::MaskBuilt => "mask building",
            Self::Composited => "compositing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Factory trait for creating inference backends
pub trait BackendFactory: Send + Sync {
    /// Create a backend of the given type from raw model bytes
    ///
    /// # Errors
    ///
    /// Returns a configuration error for:
    /// - Backend types that are not available
    /// - Model data the runtime cannot load
    /// - Execution targets the runtime cannot provide
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_data: &[u8],
        config: &PipelineConfig,
    ) -> Result<Box<dyn InferenceBackend>>;

    /// List available backend types
    fn available_backends(&self) -> Vec<BackendType>;
}

/// Factory for the runtimes compiled into this build
pub struct DefaultBackendFactory;

#[cfg(feature = "onnx")]
fn create_onnx_backend(
    model_data: &[u8],
    config: &PipelineConfig,
) -> Result<Box<dyn InferenceBackend>> {
    Ok(Box::new(crate::backends::OnnxBackend::from_memory(
        model_data, config,
    )?))
}

#[cfg(not(feature = "onnx"))]
fn create_onnx_backend(
    _model_data: &[u8],
    _config: &PipelineConfig,
) -> Result<Box<dyn InferenceBackend>> {
    Err(BgRemovalError::configuration(
        "ONNX backend not available. Rebuild with the 'onnx' feature enabled.",
    ))
}

#[cfg(feature = "tract")]
fn create_tract_backend(
    model_data: &[u8],
    config: &PipelineConfig,
) -> Result<Box<dyn InferenceBackend>> {
    Ok(Box::new(crate::backends::TractBackend::from_memory(
        model_data, config,
    )?))
}

#[cfg(not(feature = "tract"))]
fn create_tract_backend(
    _model_data: &[u8],
    _config: &PipelineConfig,
) -> Result<Box<dyn InferenceBackend>> {
    Err(BgRemovalError::configuration(
        "Tract backend not available. Rebuild with the 'tract' feature enabled.",
    ))
}

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_data: &[u8],
        config: &PipelineConfig,
    ) -> Result<Box<dyn InferenceBackend>> {
        match backend_type {
            BackendType::Onnx => create_onnx_backend(model_data, config),
            BackendType::Tract => create_tract_backend(model_data, config),
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        let mut backends = Vec::new();
        if cfg!(feature = "onnx") {
            backends.push(BackendType::Onnx);
        }
        if cfg!(feature = "tract") {
            backends.push(BackendType::Tract);
        }
        backends
    }
}

/// Per-stage wall clock timings of one call, in milliseconds
#[derive(Debug, Default, Clone, Copy)]
struct ProcessingTimings {
    resize_ms: u64,
    packing_ms: u64,
    inference_ms: u64,
    mask_ms: u64,
    compositing_ms: u64,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Background removal pipeline bound to one loaded model
///
/// # Examples
/// ```rust,no_run
/// use remove_background::{BackgroundRemover, ModelConfig, PipelineConfig};
///
/// # fn example() -> anyhow::Result<()> {
/// let config = PipelineConfig::builder()
///     .model(ModelConfig::square(320, "input_image"))
///     .build()?;
/// let remover = BackgroundRemover::new("u2netp.onnx", config)?;
/// let result = remover.remove_background_from_path("photo.jpg")?;
/// result.save("photo.png")?;
/// # Ok(())
/// # }
/// ```
pub struct BackgroundRemover {
    config: PipelineConfig,
    backend: Box<dyn InferenceBackend>,
    model_name: String,
}

impl std::fmt::Debug for BackgroundRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRemover")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("model", &self.model_name)
            .finish()
    }
}

impl BackgroundRemover {
    /// Load the model and create the configured backend
    ///
    /// # Errors
    ///
    /// Returns a configuration error for:
    /// - Invalid model geometry
    /// - A missing, unreadable or empty model artifact
    /// - A model the backend cannot load, or an unavailable execution target
    pub fn new(source: impl Into<ModelSource>, config: PipelineConfig) -> Result<Self> {
        Self::with_factory(source, config, &DefaultBackendFactory)
    }

    /// Load the model and create the backend through a custom factory
    ///
    /// # Errors
    ///
    /// Same as [`BackgroundRemover::new`], plus anything the factory returns.
    pub fn with_factory(
        source: impl Into<ModelSource>,
        config: PipelineConfig,
        factory: &dyn BackendFactory,
    ) -> Result<Self> {
        config.validate()?;
        let source = source.into();

        info!("Initializing background remover");
        debug!("Model: {}", source.display_name());
        debug!("Backend type: {}", config.backend_type);
        debug!("Execution target: {}", config.execution_target);

        let model_data = source.load_model_data()?;
        let backend = factory.create_backend(config.backend_type, &model_data, &config)?;

        info!(
            "Background remover ready ({} backend on {})",
            backend.name(),
            backend.execution_target()
        );

        Ok(Self {
            config,
            backend,
            model_name: source.display_name(),
        })
    }

    /// Wrap an already constructed backend
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` is invalid.
    pub fn with_backend(backend: Box<dyn InferenceBackend>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let model_name = format!("{} backend", backend.name());
        Ok(Self {
            config,
            backend,
            model_name,
        })
    }

    /// Construction-time configuration
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the runtime executing the model
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Remove the background of an owned RGBA image
    ///
    /// The result has the same size as the input. Only alpha changes; red,
    /// green and blue are returned exactly as given.
    ///
    /// # Errors
    ///
    /// - `Precondition` for an empty image or a stage dimension mismatch
    /// - `UnusableOutput` when the model output cannot be read as a mask
    /// - `Inference` when the runtime fails
    ///
    /// All of these are scoped to this call; the remover stays usable.
    #[instrument(
        skip(self, image),
        fields(
            backend = self.backend.name(),
            model = %self.model_name,
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn remove_background(&self, image: RgbaImage) -> Result<RgbaImage> {
        let total_start = Instant::now();
        let mut stage = ProcessingStage::Idle;
        let mut timings = ProcessingTimings::default();

        let result = self.run_to_completion(image, &mut stage, &mut timings);
        Self::report(&result, stage, timings, total_start);
        result
    }

    /// Remove the background of an already decoded image of any pixel type
    ///
    /// # Errors
    ///
    /// Same as [`BackgroundRemover::remove_background`].
    pub fn remove_background_from_image(&self, image: &DynamicImage) -> Result<RgbaImage> {
        self.remove_background(image.to_rgba8())
    }

    /// Decode an encoded image from memory and remove its background
    ///
    /// # Errors
    ///
    /// `Image` when the bytes cannot be decoded, otherwise the same as
    /// [`BackgroundRemover::remove_background`].
    pub fn remove_background_from_bytes(&self, image_bytes: &[u8]) -> Result<RgbaImage> {
        let image = ImageIOService::decode_rgba(image_bytes)
            .inspect_err(|e| Self::log_failure(ProcessingStage::Loaded, e))?;
        self.remove_background(image)
    }

    /// Read and decode an image file and remove its background
    ///
    /// # Errors
    ///
    /// `Io` or `Image` when the file cannot be read or decoded, otherwise the
    /// same as [`BackgroundRemover::remove_background`].
    pub fn remove_background_from_path<P: AsRef<Path>>(&self, path: P) -> Result<RgbaImage> {
        let image = ImageIOService::load_rgba(path.as_ref())
            .inspect_err(|e| Self::log_failure(ProcessingStage::Loaded, e))?;
        self.remove_background(image)
    }

    /// Compute the foreground mask at the resolution of `image`
    ///
    /// Runs every stage up to and including mask building.
    ///
    /// # Errors
    ///
    /// Same as [`BackgroundRemover::remove_background`].
    #[instrument(
        skip(self, image),
        fields(
            backend = self.backend.name(),
            model = %self.model_name,
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn segment(&self, image: &RgbaImage) -> Result<GrayImage> {
        let total_start = Instant::now();
        let mut stage = ProcessingStage::Idle;
        let mut timings = ProcessingTimings::default();

        let result = self.build_mask(image, &mut stage, &mut timings);
        if result.is_ok() {
            stage = ProcessingStage::Done;
        }
        Self::report(&result, stage, timings, total_start);
        result
    }

    fn run_to_completion(
        &self,
        original: RgbaImage,
        stage: &mut ProcessingStage,
        timings: &mut ProcessingTimings,
    ) -> Result<RgbaImage> {
        let mask = self.build_mask(&original, stage, timings)?;

        *stage = ProcessingStage::Composited;
        let start = Instant::now();
        let result = {
            let _span = span!(Level::DEBUG, "compositing").entered();
            Compositor::composite(original, &mask)?
        };
        timings.compositing_ms = elapsed_ms(start);

        *stage = ProcessingStage::Done;
        Ok(result)
    }

    /// Stages from the original snapshot to the full-resolution mask
    ///
    /// `stage` is advanced before each stage runs, so on error it names the
    /// stage that failed. Intermediate buffers are dropped at the end of the
    /// block that produced them.
    fn build_mask(
        &self,
        original: &RgbaImage,
        stage: &mut ProcessingStage,
        timings: &mut ProcessingTimings,
    ) -> Result<GrayImage> {
        let model = &self.config.model;
        let policy = &self.config.resize;
        let original_dimensions = original.dimensions();

        *stage = ProcessingStage::Loaded;
        if original_dimensions.0 == 0 || original_dimensions.1 == 0 {
            return Err(BgRemovalError::precondition(format!(
                "Input image has no pixels ({}x{})",
                original_dimensions.0, original_dimensions.1
            )));
        }

        *stage = ProcessingStage::Resized;
        let start = Instant::now();
        let working = {
            let _span = span!(
                Level::DEBUG,
                "resizing",
                original_width = %original_dimensions.0,
                original_height = %original_dimensions.1,
                target = %format!("{}x{}", model.input_width, model.input_height)
            )
            .entered();
            policy.resize(original, model.input_width, model.input_height)
        };
        timings.resize_ms = elapsed_ms(start);

        *stage = ProcessingStage::Packed;
        let start = Instant::now();
        let input_tensor = {
            let _span = span!(Level::DEBUG, "packing").entered();
            TensorValidator::ensure_dimensions(
                "packing",
                working.dimensions(),
                (model.input_width, model.input_height),
            )?;
            TensorPacker::pack(&working)
        };
        drop(working);
        timings.packing_ms = elapsed_ms(start);

        *stage = ProcessingStage::Inferred;
        let start = Instant::now();
        let output_tensor = {
            let _span = span!(
                Level::INFO,
                "inference",
                backend = self.backend.name(),
                input = %model.input_parameter_name
            )
            .entered();
            self.backend
                .infer(&model.input_parameter_name, &input_tensor)?
        };
        drop(input_tensor);
        timings.inference_ms = elapsed_ms(start);

        *stage = ProcessingStage::MaskBuilt;
        let start = Instant::now();
        let mask = {
            let _span = span!(
                Level::DEBUG,
                "mask_building",
                width = %original_dimensions.0,
                height = %original_dimensions.1
            )
            .entered();
            MaskBuilder::build(&output_tensor, model, original_dimensions, policy)?
        };
        timings.mask_ms = elapsed_ms(start);

        Ok(mask)
    }

    fn report<T>(
        result: &Result<T>,
        stage: ProcessingStage,
        timings: ProcessingTimings,
        total_start: Instant,
    ) {
        match result {
            Ok(_) => {
                trace_debug!(
                    resize_ms = timings.resize_ms,
                    packing_ms = timings.packing_ms,
                    inference_ms = timings.inference_ms,
                    mask_ms = timings.mask_ms,
                    compositing_ms = timings.compositing_ms,
                    "Stage timings"
                );
                trace_info!(total_ms = elapsed_ms(total_start), "Background removal complete");
            },
            Err(e) => Self::log_failure(stage, e),
        }
    }

    fn log_failure(stage: ProcessingStage, error: &BgRemovalError) {
        warn!(stage = %stage, error = %error, "Background removal failed");
    }
}
