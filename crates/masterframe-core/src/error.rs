use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MasterFrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame {path}: {reason}")]
    InvalidFrame { path: PathBuf, reason: String },

    #[error(
        "Shape mismatch for {}: expected {}x{}, got {}x{}",
        .path.display(), .expected.1, .expected.0, .actual.1, .actual.0
    )]
    ShapeMismatch {
        path: PathBuf,
        /// (height, width) of the stack.
        expected: (usize, usize),
        /// (height, width) of the offending frame.
        actual: (usize, usize),
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No input frames")]
    NoInputFrames,

    #[error("No surviving samples at pixel (row {row}, col {col})")]
    EmptyPixelSet { row: usize, col: usize },

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,
}

impl MasterFrameError {
    pub(crate) fn invalid_frame(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MasterFrameError>;
