//! Errors raised while opening or decoding dataset files.
//!
//! All errors use `thiserror`-derived enums with structured context. I/O
//! errors are wrapped in `Arc` to keep the error type cheap to move.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::Backend;

/// Errors arising from dataset backends.
#[derive(Debug, Error)]
pub enum CdfError {
    /// The file could not be read.
    #[error("I/O error reading '{}': {source}", path.display())]
    Io {
        /// File being opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file does not start with a netCDF classic magic number.
    #[error("'{}' is not a netCDF classic file", path.display())]
    BadMagic {
        /// File being opened.
        path: PathBuf,
    },

    /// The file header or data section is malformed.
    #[error("malformed netCDF file '{}' at byte {offset}: {message}", path.display())]
    Parse {
        /// File being opened.
        path: PathBuf,
        /// Byte offset where decoding failed.
        offset: usize,
        /// Description of the malformation.
        message: String,
    },

    /// The file uses a feature this backend does not decode.
    #[error("unsupported netCDF feature in '{}': {message}", path.display())]
    Unsupported {
        /// File being opened.
        path: PathBuf,
        /// Description of the unsupported feature.
        message: String,
    },

    /// The selected backend cannot serve the request.
    #[error("backend '{backend}' unavailable: {reason}")]
    BackendUnavailable {
        /// Backend that was selected.
        backend: Backend,
        /// Why it cannot be used.
        reason: String,
    },
}

impl CdfError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }
}
