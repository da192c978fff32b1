//! Error types for the envmap pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The image codec could not decode the source asset
    #[error("Failed to load source image {path}: {reason}")]
    SourceLoad { path: PathBuf, reason: String },

    /// The layout normalizer could not classify a non-cubemap image
    #[error("Unrecognized image layout: {width}x{height}, {num_faces} face(s)")]
    LayoutUnrecognized {
        width: u32,
        height: u32,
        num_faces: u32,
    },

    /// The pixel format table has no GPU mapping for this encoding
    #[error("Unsupported pixel encoding: {0}")]
    UnsupportedPixelEncoding(String),

    /// A cache file exists but could not be read back
    #[error("Failed to read cache file {path}: {reason}")]
    CacheRead { path: PathBuf, reason: String },

    /// The external filter engine reported failure
    #[error("Filter failed: {0}")]
    FilterDegraded(String),

    /// The cube texture builder was handed a non-canonical image
    #[error("Image is not a cubemap: {num_faces} face(s), expected 6")]
    NotACubemap { num_faces: u32 },

    /// Invalid data structure in a container file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Image dimensions or metadata do not describe a valid buffer
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a source-load error.
    pub fn source_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::NotACubemap { num_faces: 1 };
        assert!(e.to_string().contains("1 face"));

        let e = Error::LayoutUnrecognized {
            width: 100,
            height: 37,
            num_faces: 1,
        };
        assert!(e.to_string().contains("100x37"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
