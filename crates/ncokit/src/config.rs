//! Engine configuration and toolkit discovery.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::NcoError;
use crate::invoke::RetryPolicy;
use crate::options::OptValue;

/// Environment variable naming the directory holding the NCO binaries.
pub const TOOLKIT_DIR_ENV: &str = "NCO_PATH";

/// Settings shared by every call made through one engine.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory containing operator binaries; resolved lazily when unset.
    pub toolkit_dir: Option<Utf8PathBuf>,
    /// Synthesize `--overwrite` for file-writing calls unless a token
    /// already settles the question. Defaults to on.
    pub force_output: bool,
    /// Convert [`NcoError::OperationFailed`] into an absent result instead
    /// of an error.
    pub return_none_on_error: bool,
    /// Debug level appended as `--nco_dbg_lvl=N` when nonzero.
    pub debug: u8,
    /// Backend used to materialize outputs as datasets or arrays.
    pub backend: ncokit_cdf::Backend,
    /// Directory for synthesized output paths; system default when unset.
    pub temp_dir: Option<Utf8PathBuf>,
    /// Options merged into every call, overridable per call by key.
    pub global_options: Vec<(String, OptValue)>,
    /// Kill the child process after this long.
    pub timeout: Option<Duration>,
    /// Recovery applied when spawning fails.
    pub retry: RetryPolicy,
}

impl Config {
    /// Configuration with forced overwrites on and everything else default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            force_output: true,
            ..Self::default()
        }
    }

    /// Pins the toolkit directory, skipping discovery.
    #[must_use]
    pub fn with_toolkit_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.toolkit_dir = Some(dir.into());
        self
    }

    /// Routes synthesized outputs into `dir` (see `TempOutputDir`).
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Adds an option applied to every call unless the call overrides it.
    #[must_use]
    pub fn with_global_option(mut self, key: impl Into<String>, value: impl Into<OptValue>) -> Self {
        self.global_options.push((key.into(), value.into()));
        self
    }
}

/// Locates the toolkit directory: explicit setting, then the
/// [`TOOLKIT_DIR_ENV`] environment variable, then the directory holding
/// `ncks` on `PATH`.
///
/// # Errors
///
/// Returns [`NcoError::ToolkitNotFound`] when no source yields a directory.
pub fn resolve_toolkit_dir(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf, NcoError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(TOOLKIT_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(Utf8PathBuf::from(dir));
        }
    }
    let ncks = which::which("ncks").map_err(|source| NcoError::ToolkitNotFound {
        detail: format!("set {TOOLKIT_DIR_ENV} or put ncks on PATH ({source})"),
    })?;
    let parent = ncks
        .parent()
        .map(std::path::Path::to_path_buf)
        .ok_or_else(|| NcoError::ToolkitNotFound {
            detail: format!("ncks at {} has no parent directory", ncks.display()),
        })?;
    Utf8PathBuf::from_path_buf(parent).map_err(|path| NcoError::ToolkitNotFound {
        detail: format!("toolkit directory {} is not valid UTF-8", path.display()),
    })
}

/// Whether the toolkit can be located at all.
#[must_use]
pub fn has_nco() -> bool {
    resolve_toolkit_dir(None).is_ok()
}
