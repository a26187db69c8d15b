//! Service layer for file and encoding concerns around the pipeline

pub mod io;

pub use io::{ImageIOService, TransparentColorMode};
