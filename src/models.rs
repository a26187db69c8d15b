//! Model artifact sources

use crate::error::{BgRemovalError, Result};
use std::path::{Path, PathBuf};

/// Where the serialized model comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Model file on disk
    File(PathBuf),
    /// Model already loaded into memory
    Bytes(Vec<u8>),
}

impl ModelSource {
    /// Model file on disk
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::File(path) => format!(
                "file:{}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
            Self::Bytes(data) => format!("memory:{} bytes", data.len()),
        }
    }

    /// Read the model bytes
    ///
    /// # Errors
    /// A missing, unreadable or empty artifact is a configuration error.
    pub fn load_model_data(&self) -> Result<Vec<u8>> {
        let data = match self {
            Self::File(path) => {
                if !path.is_file() {
                    return Err(BgRemovalError::model_not_found(path));
                }
                std::fs::read(path).map_err(|e| {
                    BgRemovalError::model_load_error("read", path, &e.to_string())
                })?
            },
            Self::Bytes(data) => data.clone(),
        };

        if data.is_empty() {
            return Err(BgRemovalError::configuration(format!(
                "Model data from {} is empty",
                self.display_name()
            )));
        }

        log::debug!(
            "Loaded model data from {} ({:.2} MB)",
            self.display_name(),
            data.len() as f64 / (1024.0 * 1024.0)
        );
        Ok(data)
    }
}

impl From<PathBuf> for ModelSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ModelSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<&str> for ModelSource {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ModelSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}
