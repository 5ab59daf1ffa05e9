//! Scoped cleanup for synthesized output files.
//!
//! The engine never deletes outputs it synthesized; callers that want
//! automatic cleanup route them into a [`TempOutputDir`], whose contents
//! are removed deterministically when the guard drops (or earlier via
//! [`TempOutputDir::close`]).

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::error::NcoError;

/// Owns a temporary directory for synthesized outputs.
///
/// Borrow [`path`](Self::path) into `Config::temp_dir` so every synthesized
/// output lands inside; dropping the guard removes the directory and
/// everything in it.
#[derive(Debug)]
pub struct TempOutputDir {
    dir: Option<TempDir>,
    path: Utf8PathBuf,
}

impl TempOutputDir {
    /// Creates a fresh directory under the system temp location.
    ///
    /// # Errors
    ///
    /// Returns [`NcoError::Io`] when the directory cannot be created or its
    /// path is not valid UTF-8.
    pub fn new() -> Result<Self, NcoError> {
        let dir = TempDir::with_prefix("ncokit.")
            .map_err(|source| NcoError::io(&std::env::temp_dir(), source))?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
            NcoError::io(
                &path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "temporary directory is not valid UTF-8",
                ),
            )
        })?;
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// The directory that synthesized outputs should be written into.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Removes the directory now, surfacing any deletion failure that a
    /// silent drop would swallow.
    ///
    /// # Errors
    ///
    /// Returns [`NcoError::Io`] when deletion fails.
    pub fn close(mut self) -> Result<(), NcoError> {
        if let Some(dir) = self.dir.take() {
            dir.close()
                .map_err(|source| NcoError::io(self.path.as_std_path(), source))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_removed_on_drop() {
        let guard = TempOutputDir::new().expect("create temp dir");
        let path = guard.path().to_path_buf();
        std::fs::write(path.join("scratch.nc"), b"x").expect("write scratch file");
        drop(guard);
        assert!(!path.as_std_path().exists());
    }

    #[test]
    fn close_reports_success_and_removes() {
        let guard = TempOutputDir::new().expect("create temp dir");
        let path = guard.path().to_path_buf();
        guard.close().expect("close temp dir");
        assert!(!path.as_std_path().exists());
    }
}
