//! Sources of the base firmware image

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::RetrievalError;

/// An interface for fetching the base firmware image that configuration is added to.
///
/// Implementations do not retry, a failed fetch is returned to the caller as-is.
pub trait FirmwareSource {
    /// Returns a human readable description of where the image comes from
    fn location(&self) -> String;

    /// Fetches the raw bytes of the image
    fn fetch(&self) -> Result<Vec<u8>, RetrievalError>;

    /// Fetches the image as text, returning `RetrievalError::NotText` if it isn't UTF-8
    fn fetch_text(&self) -> Result<String, RetrievalError> {
        String::from_utf8(self.fetch()?).map_err(|_| RetrievalError::NotText)
    }
}

/// Reads the firmware image from a file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> FileSource {
        FileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl FirmwareSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, RetrievalError> {
        debug!("Reading firmware image from {}", self.path.display());

        let data = fs::read(&self.path)?;

        debug!("Read {} bytes of firmware", data.len());

        Ok(data)
    }
}

/// A firmware image that is already in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new<D: Into<Vec<u8>>>(data: D) -> MemorySource {
        MemorySource { data: data.into() }
    }
}

impl FirmwareSource for MemorySource {
    fn location(&self) -> String {
        format!("<memory, {} bytes>", self.data.len())
    }

    fn fetch(&self) -> Result<Vec<u8>, RetrievalError> {
        Ok(self.data.clone())
    }
}
