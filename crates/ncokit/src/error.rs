//! Domain errors raised by the dispatch engine.
//!
//! All errors use `thiserror`-derived enums with structured context so
//! callers can inspect the failure programmatically. Only
//! [`NcoError::OperationFailed`] participates in the dispatcher's
//! suppress-and-return-sentinel policy; every other kind indicates a
//! programmer or environment error and always propagates.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from operator dispatch and invocation.
#[derive(Debug, Error)]
pub enum NcoError {
    /// The requested name is not a known NCO operator.
    #[error("unknown operator '{name}'")]
    UnknownOperator {
        /// Name that was looked up.
        name: String,
    },

    /// An option value the serializer cannot render.
    #[error("unsupported option '{key}': {reason}")]
    UnsupportedOption {
        /// Option key or raw option text.
        key: String,
        /// Why it cannot be rendered.
        reason: String,
    },

    /// An output target that is not a single path.
    #[error("invalid output specification: {detail}")]
    InvalidOutputSpec {
        /// What was wrong with the target.
        detail: String,
    },

    /// The requested variable is absent from the operator's output.
    #[error("variable '{name}' not found in '{}'", path.display())]
    VariableNotFound {
        /// Variable that was requested.
        name: String,
        /// File that was searched.
        path: PathBuf,
    },

    /// The external operator exited with a nonzero status.
    ///
    /// Carries the captured streams verbatim so callers can diagnose
    /// tool-specific failures without the engine interpreting them.
    #[error("(return code {return_code}) {}", String::from_utf8_lossy(stderr))]
    OperationFailed {
        /// Captured standard output.
        stdout: Vec<u8>,
        /// Captured standard error, verbatim.
        stderr: Vec<u8>,
        /// Child exit status.
        return_code: i32,
    },

    /// The NCO toolkit directory could not be located.
    #[error("NCO toolkit not found: {detail}")]
    ToolkitNotFound {
        /// How the lookup failed.
        detail: String,
    },

    /// Direct vector exec hit the operating system's argument-list limit.
    ///
    /// Retrying in shell mode is an explicit invoker policy, never silent;
    /// see `RetryPolicy`.
    #[error("argument list too long invoking '{operator}'")]
    ArgListTooLong {
        /// Operator being invoked.
        operator: String,
    },

    /// The child process did not finish within the configured timeout.
    #[error("operator '{operator}' timed out after {timeout_secs}s")]
    Timeout {
        /// Operator being invoked.
        operator: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The child process could not be spawned.
    #[error("failed to spawn '{operator}': {source}")]
    Spawn {
        /// Operator being invoked.
        operator: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An I/O error outside child-process handling.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Path being touched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The installed toolkit's version string could not be parsed.
    #[error("could not determine NCO version from: {output}")]
    VersionUnknown {
        /// Text that failed to parse.
        output: String,
    },

    /// A dataset backend failure while materialising results.
    #[error(transparent)]
    Backend(#[from] ncokit_cdf::CdfError),
}

impl NcoError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn spawn(operator: &str, source: std::io::Error) -> Self {
        Self::Spawn {
            operator: String::from(operator),
            source: Arc::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_failed_display_carries_stderr_verbatim() {
        let err = NcoError::OperationFailed {
            stdout: Vec::new(),
            stderr: b"ncks: ERROR file not found\n".to_vec(),
            return_code: 1,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("(return code 1)"));
        assert!(rendered.contains("ncks: ERROR file not found"));
    }

    #[test]
    fn unknown_operator_names_the_operator() {
        let err = NcoError::UnknownOperator {
            name: String::from("ncfrobnicate"),
        };
        assert_eq!(err.to_string(), "unknown operator 'ncfrobnicate'");
    }
}
