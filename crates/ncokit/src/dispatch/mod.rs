//! Operator registry, argument assembly, and the call pipeline.
//!
//! Every operator the toolkit ships is an entry in a closed registry;
//! calls go through [`Nco::call`] (or the generated per-operator
//! methods), which assembles the argument vector, resolves the output
//! target, executes the child process, and materializes the result.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use tracing::{debug, warn};

use crate::config::{resolve_toolkit_dir, Config};
use crate::error::NcoError;
use crate::invoke::Invoker;
use crate::materialize::{materialize, CallOutput, ReturnShape};
use crate::options::{render_kwarg, render_raw, OptArg, OptValue};
use crate::output::{classify, normalize_output, temp_output_path};
use crate::version::probe;

#[cfg(all(test, unix))]
mod tests;

const DISPATCH_TARGET: &str = "ncokit::dispatch";

/// One registered operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    /// Binary name under the toolkit directory.
    pub name: &'static str,
    /// Modifies its input file instead of writing a separate output.
    pub in_place: bool,
    /// One-line summary shown in listings.
    pub description: &'static str,
}

const OPERATORS: [OperatorSpec; 14] = [
    OperatorSpec {
        name: "ncap2",
        in_place: false,
        description: "arithmetic processor",
    },
    OperatorSpec {
        name: "ncatted",
        in_place: true,
        description: "attribute editor",
    },
    OperatorSpec {
        name: "ncbo",
        in_place: false,
        description: "binary operator",
    },
    OperatorSpec {
        name: "ncdump",
        in_place: false,
        description: "text dumper",
    },
    OperatorSpec {
        name: "ncea",
        in_place: false,
        description: "ensemble averager",
    },
    OperatorSpec {
        name: "ncecat",
        in_place: false,
        description: "ensemble concatenator",
    },
    OperatorSpec {
        name: "nces",
        in_place: false,
        description: "ensemble statistics",
    },
    OperatorSpec {
        name: "ncflint",
        in_place: false,
        description: "file interpolator",
    },
    OperatorSpec {
        name: "ncks",
        in_place: false,
        description: "kitchen sink",
    },
    OperatorSpec {
        name: "ncpdq",
        in_place: false,
        description: "permute dimensions quickly",
    },
    OperatorSpec {
        name: "ncra",
        in_place: false,
        description: "record averager",
    },
    OperatorSpec {
        name: "ncrcat",
        in_place: false,
        description: "record concatenator",
    },
    OperatorSpec {
        name: "ncrename",
        in_place: true,
        description: "renamer",
    },
    OperatorSpec {
        name: "ncwa",
        in_place: false,
        description: "weighted averager",
    },
];

/// All registered operators, in listing order.
#[must_use]
pub fn operators() -> &'static [OperatorSpec] {
    &OPERATORS
}

fn lookup(name: &str) -> Option<&'static OperatorSpec> {
    OPERATORS.iter().find(|spec| spec.name == name)
}

/// Arguments for one operator call, built fluently.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    inputs: Vec<String>,
    output: Vec<String>,
    options: Vec<OptArg>,
    kwargs: Vec<(String, OptValue)>,
    force: Option<bool>,
    env: Vec<(String, String)>,
    debug: Option<u8>,
    return_shape: ReturnShape,
    prints_out: bool,
    use_shell: bool,
}

impl CallArgs {
    /// An empty call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one input path.
    #[must_use]
    pub fn input(mut self, path: impl Into<String>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Appends several input paths.
    #[must_use]
    pub fn inputs<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Sets the explicit output path.
    #[must_use]
    pub fn output(mut self, path: impl Into<String>) -> Self {
        self.output.push(path.into());
        self
    }

    /// Appends one raw or structured option.
    #[must_use]
    pub fn option(mut self, option: impl Into<OptArg>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Appends one keyword option, rendered as `--key[=value]`.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<OptValue>) -> Self {
        self.kwargs.push((key.into(), value.into()));
        self
    }

    /// Overrides the engine's forced-overwrite default for this call.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }

    /// Adds an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Overrides the engine's debug level for this call.
    #[must_use]
    pub const fn debug(mut self, level: u8) -> Self {
        self.debug = Some(level);
        self
    }

    /// Requests the named variable as a dense array.
    #[must_use]
    pub fn return_array(mut self, variable: impl Into<String>) -> Self {
        self.return_shape.array = Some(variable.into());
        self
    }

    /// Requests the named variable with fill values masked.
    #[must_use]
    pub fn return_masked_array(mut self, variable: impl Into<String>) -> Self {
        self.return_shape.masked_array = Some(variable.into());
        self
    }

    /// Requests the output opened as a dataset handle.
    #[must_use]
    pub const fn return_handle(mut self) -> Self {
        self.return_shape.handle = true;
        self
    }

    /// Declares that this invocation prints to standard output, overriding
    /// token classification. No output token is synthesized and the result
    /// is the captured text.
    #[must_use]
    pub const fn operator_prints_out(mut self) -> Self {
        self.prints_out = true;
        self
    }

    /// Runs the call through `/bin/sh` instead of spawning directly.
    #[must_use]
    pub const fn use_shell(mut self) -> Self {
        self.use_shell = true;
        self
    }
}

/// Record of the most recent invocation, kept for introspection.
#[derive(Debug, Clone)]
pub struct LastInvocation {
    /// Operator name.
    pub operator: String,
    /// The exact argument vector executed.
    pub tokens: Vec<String>,
    /// Child exit status.
    pub return_code: i32,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

/// The engine: shared configuration plus cached toolkit state.
#[derive(Debug, Default)]
pub struct Nco {
    config: Config,
    toolkit_dir: Option<Utf8PathBuf>,
    version: Option<Option<Version>>,
    help_cache: HashMap<&'static str, String>,
    default_shape: ReturnShape,
    last: Option<LastInvocation>,
}

macro_rules! operator_methods {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// See [`Nco::call`].
            pub fn $name(&mut self, args: CallArgs) -> Result<Option<CallOutput>, NcoError> {
                self.call(stringify!($name), args)
            }
        )*
    };
}

impl Nco {
    /// An engine with default configuration (forced overwrites on).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// An engine over an explicit configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The acting configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The most recent invocation, if any call has run.
    #[must_use]
    pub const fn last_invocation(&self) -> Option<&LastInvocation> {
        self.last.as_ref()
    }

    /// Makes every subsequent call without an explicit shape return the
    /// named variable as a dense array.
    pub fn set_return_array(&mut self, variable: impl Into<String>) {
        self.default_shape = ReturnShape {
            array: Some(variable.into()),
            ..ReturnShape::default()
        };
    }

    /// Restores path results as the default shape.
    pub fn unset_return_array(&mut self) {
        self.default_shape = ReturnShape::default();
    }

    /// The resolved toolkit directory, locating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`NcoError::ToolkitNotFound`] when no source yields a
    /// directory.
    pub fn toolkit_path(&mut self) -> Result<&Utf8Path, NcoError> {
        self.toolkit_dir()
    }

    /// Repoints the engine at a different toolkit directory, dropping the
    /// cached version and help text.
    pub fn set_toolkit_path(&mut self, dir: impl Into<Utf8PathBuf>) {
        let dir = dir.into();
        self.config.toolkit_dir = Some(dir.clone());
        self.toolkit_dir = Some(dir);
        self.version = None;
        self.help_cache.clear();
    }

    /// The operator's `--help` text, fetched best-effort on first request
    /// and cached. Failures yield an empty description.
    ///
    /// # Errors
    ///
    /// Returns [`NcoError::UnknownOperator`] for an unregistered name and
    /// [`NcoError::ToolkitNotFound`] when no toolkit directory can be
    /// located.
    pub fn operator_description(&mut self, operator: &str) -> Result<&str, NcoError> {
        let spec = lookup(operator).ok_or_else(|| NcoError::UnknownOperator {
            name: operator.to_owned(),
        })?;
        let dir = self.toolkit_dir()?.to_path_buf();
        let text = self.help_cache.entry(spec.name).or_insert_with(|| {
            let tokens = vec![dir.join(spec.name).into_string(), String::from("--help")];
            Invoker::new()
                .run(spec.name, &tokens, &[], false)
                .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_owned())
                .unwrap_or_default()
        });
        Ok(text)
    }

    /// Reports the toolkit version, probing and caching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`NcoError::ToolkitNotFound`] when no toolkit directory can
    /// be located.
    pub fn version(&mut self) -> Result<Option<Version>, NcoError> {
        let dir = self.toolkit_dir()?.to_path_buf();
        Ok(self.cached_version(&dir))
    }

    fn toolkit_dir(&mut self) -> Result<&Utf8Path, NcoError> {
        if self.toolkit_dir.is_none() {
            self.toolkit_dir = Some(resolve_toolkit_dir(self.config.toolkit_dir.as_deref())?);
        }
        // Populated just above.
        match &self.toolkit_dir {
            Some(dir) => Ok(dir),
            None => Err(NcoError::ToolkitNotFound {
                detail: String::from("toolkit directory resolution failed"),
            }),
        }
    }

    fn cached_version(&mut self, dir: &Utf8Path) -> Option<Version> {
        if self.version.is_none() {
            let probed = match probe(dir) {
                Ok(version) => Some(version),
                Err(err) => {
                    warn!(target: DISPATCH_TARGET, error = %err, "version probe failed");
                    None
                }
            };
            self.version = Some(probed);
        }
        self.version.clone().flatten()
    }

    /// Invokes `operator` with `args` and returns the materialized result.
    ///
    /// `Ok(None)` appears only when the configuration suppresses operator
    /// failures (`return_none_on_error`).
    ///
    /// # Errors
    ///
    /// [`NcoError::UnknownOperator`] for an unregistered name,
    /// [`NcoError::OperationFailed`] for a nonzero exit (unless
    /// suppressed), plus the spawn, output-spec, and materialization
    /// errors of the pipeline stages.
    pub fn call(&mut self, operator: &str, args: CallArgs) -> Result<Option<CallOutput>, NcoError> {
        let spec = lookup(operator).ok_or_else(|| NcoError::UnknownOperator {
            name: operator.to_owned(),
        })?;
        let dir = self.toolkit_dir()?.to_path_buf();

        let mut tokens = vec![dir.join(spec.name).into_string()];
        let debug_level = args.debug.unwrap_or(self.config.debug);
        if debug_level > 0 {
            tokens.push(format!("--nco_dbg_lvl={debug_level}"));
        }
        for option in &args.options {
            tokens.extend(render_raw(option)?);
        }
        for (key, value) in merged_kwargs(&self.config.global_options, &args.kwargs) {
            tokens.extend(render_kwarg(key, value));
        }

        // Version matters only for the ncks append print-set switch; skip
        // the probe otherwise.
        let needs_version =
            spec.name == "ncks" && classify(spec.name, &tokens, None).appends;
        let version = if needs_version {
            self.cached_version(&dir)
        } else {
            None
        };
        let classification = classify(spec.name, &tokens, version.as_ref());
        let prints = classification.prints || args.prints_out;

        let explicit_output = normalize_output(&args.output)?;
        let mut result_path: Option<Utf8PathBuf> = None;
        if spec.in_place {
            if explicit_output.is_some() {
                return Err(NcoError::InvalidOutputSpec {
                    detail: format!("{operator} modifies its input in place"),
                });
            }
            let first = args.inputs.first().ok_or_else(|| NcoError::InvalidOutputSpec {
                detail: format!("{operator} requires an input to modify"),
            })?;
            result_path = Some(Utf8PathBuf::from(first));
        } else if !prints {
            let output = match explicit_output {
                Some(path) => Utf8PathBuf::from(path),
                None => temp_output_path(
                    self.config.temp_dir.as_deref(),
                    spec.name,
                    args.inputs.first().map(String::as_str),
                )?,
            };
            let force = args.force.unwrap_or(self.config.force_output);
            if force && !classification.settles_overwrite() && output.as_std_path().exists() {
                tokens.push(String::from("--overwrite"));
            }
            tokens.push(format!("--output={output}"));
            result_path = Some(output);
        }
        tokens.extend(args.inputs.iter().cloned());

        debug!(
            target: DISPATCH_TARGET,
            operator = spec.name,
            command = %shell_words::join(tokens.iter().map(String::as_str)),
            "invoking"
        );
        let mut invoker = Invoker::new().with_retry(self.config.retry);
        if let Some(timeout) = self.config.timeout {
            invoker = invoker.with_timeout(timeout);
        }
        let out = invoker.run(spec.name, &tokens, &args.env, args.use_shell)?;
        self.last = Some(LastInvocation {
            operator: spec.name.to_owned(),
            tokens,
            return_code: out.return_code,
            stdout: out.stdout.clone(),
            stderr: out.stderr.clone(),
        });

        if !out.success() {
            let err = NcoError::OperationFailed {
                stdout: out.stdout,
                stderr: out.stderr,
                return_code: out.return_code,
            };
            if self.config.return_none_on_error {
                warn!(target: DISPATCH_TARGET, operator = spec.name, error = %err, "suppressed");
                return Ok(None);
            }
            return Err(err);
        }

        if prints {
            return Ok(Some(CallOutput::Stdout(out.stdout)));
        }
        let path = result_path.ok_or_else(|| NcoError::InvalidOutputSpec {
            detail: String::from("no output path was resolved"),
        })?;
        let shape = if args.return_shape.requests_any() {
            &args.return_shape
        } else {
            &self.default_shape
        };
        materialize(self.config.backend, path, shape).map(Some)
    }

    operator_methods! {
        /// Calls `ncap2`, the arithmetic processor.
        ncap2,
        /// Calls `ncatted`, the attribute editor (modifies its input).
        ncatted,
        /// Calls `ncbo`, the binary operator.
        ncbo,
        /// Calls `ncdump`, the text dumper (always prints).
        ncdump,
        /// Calls `ncea`, the ensemble averager.
        ncea,
        /// Calls `ncecat`, the ensemble concatenator.
        ncecat,
        /// Calls `nces`, the ensemble statistics operator.
        nces,
        /// Calls `ncflint`, the file interpolator.
        ncflint,
        /// Calls `ncks`, the kitchen-sink subsetter.
        ncks,
        /// Calls `ncpdq`, the dimension permuter.
        ncpdq,
        /// Calls `ncra`, the record averager.
        ncra,
        /// Calls `ncrcat`, the record concatenator.
        ncrcat,
        /// Calls `ncrename`, the renamer (modifies its input).
        ncrename,
        /// Calls `ncwa`, the weighted averager.
        ncwa,
    }
}

/// Global options first, each skipped when the call overrides its key,
/// then the call's own options in declaration order.
fn merged_kwargs<'a>(
    globals: &'a [(String, OptValue)],
    call: &'a [(String, OptValue)],
) -> impl Iterator<Item = (&'a str, &'a OptValue)> {
    globals
        .iter()
        .filter(|(key, _)| !call.iter().any(|(k, _)| k == key))
        .chain(call.iter())
        .map(|(key, value)| (key.as_str(), value))
}
