//! Shared utilities for the background removal pipeline

pub mod resize;
pub mod validation;

pub use resize::StretchResize;
pub use validation::TensorValidator;
