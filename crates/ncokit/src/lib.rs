//! Programmatic driver for the NCO netCDF Operators toolkit.
//!
//! Each toolkit operator (`ncra`, `ncks`, `ncatted`, ...) is exposed as a
//! method on [`Nco`]; keyword options, raw option strings, and structured
//! options ([`Atted`], [`Limit`], [`Rename`]) are rendered into an argument
//! vector, the operator runs as a child process, and the result comes back
//! as captured text, an output path, an open dataset handle, or a variable
//! read into a (masked) array.
//!
//! ```no_run
//! use ncokit::{CallArgs, Nco};
//!
//! # fn main() -> Result<(), ncokit::NcoError> {
//! let mut nco = Nco::new();
//! let averaged = nco.ncra(
//!     CallArgs::new()
//!         .inputs(["jan.nc", "feb.nc", "mar.nc"])
//!         .output("q1.nc"),
//! )?;
//! let mean = nco.ncwa(
//!     CallArgs::new()
//!         .input("q1.nc")
//!         .kwarg("avg", vec!["time"])
//!         .return_array("temperature"),
//! )?;
//! # Ok(()) }
//! ```
//!
//! Outputs are written next to the caller's explicit path, or to a
//! synthesized temporary path that the engine never deletes; route those
//! through a [`TempOutputDir`] for scoped cleanup.

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod custom;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod materialize;
pub mod options;
pub mod output;
pub mod temp;
pub mod version;

pub use config::{has_nco, resolve_toolkit_dir, Config, TOOLKIT_DIR_ENV};
pub use custom::{
    Atted, AttedMode, AttedValue, AttKind, CustomOption, Limit, LimitValue, Rename, RenameKind,
    RenderOption,
};
pub use dispatch::{operators, CallArgs, LastInvocation, Nco, OperatorSpec};
pub use error::NcoError;
pub use invoke::{Invoker, ProcessOutput, RetryPolicy};
pub use materialize::{CallOutput, ReturnShape};
pub use options::{OptArg, OptValue};
pub use output::{classify, Classification};
pub use temp::TempOutputDir;
