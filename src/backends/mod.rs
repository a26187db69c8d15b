//! Backend implementations for different inference engines
//!
//! - ONNX Runtime backend (CPU or CUDA device)
//! - Tract backend (pure Rust, CPU only)
//! - Mock backend (deterministic stub for tests and benchmarks)

pub mod mock;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "tract")]
pub mod tract;

pub use self::mock::MockBackend;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;
