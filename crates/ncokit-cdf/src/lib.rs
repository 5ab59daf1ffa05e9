//! Structured-file backend for the `ncokit` dispatch engine.
//!
//! NCO operators read and write netCDF datasets. This crate gives the engine
//! a handle over such a file: named dimensions, named variables with dense
//! numeric contents, and attribute maps (used, among other things, to find
//! `_FillValue` sentinels for masked-array materialisation).
//!
//! Two interchangeable backends are exposed through [`Backend`]:
//!
//! - [`Backend::Classic`] — a lightweight pure-Rust reader for the netCDF
//!   classic formats (CDF-1 and the 64-bit-offset CDF-2 variant). Always
//!   available, read-only.
//! - [`Backend::NetCdf4`] — a fully-featured backend binding the system
//!   netCDF-C library through the `netcdf` crate. Only compiled in with the
//!   `netcdf4` cargo feature; selecting it without the feature yields
//!   [`CdfError::BackendUnavailable`] at open time.
//!
//! The `test-support` feature additionally exposes [`writer::ClassicWriter`],
//! a minimal classic-format writer used by test suites to fabricate input
//! datasets without a netCDF toolchain.

pub mod classic;
mod error;
mod model;
#[cfg(feature = "netcdf4")]
mod netcdf4;
#[cfg(any(test, feature = "test-support"))]
pub mod writer;

use std::fmt;
use std::path::Path;

pub use error::CdfError;
pub use model::{Array, AttrValue, Attribute, Dataset, Dimension, MaskedArray, NcType, Variable};

/// File access mode requested from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Open for reading only.
    Read,
    /// Open for reading and writing (only honoured by the `netcdf4` backend).
    ReadWrite,
}

/// Selects which dataset backend opens an output file.
///
/// Selection is validated when a file is opened, not when the configuration
/// is built, so an engine configured for [`Backend::NetCdf4`] fails only if a
/// materialisation is actually requested without the `netcdf4` feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Pure-Rust netCDF classic reader.
    #[default]
    Classic,
    /// netCDF-C library backend (requires the `netcdf4` cargo feature).
    NetCdf4,
}

impl Backend {
    /// Opens `path` with this backend and returns the dataset handle.
    ///
    /// # Errors
    ///
    /// Returns [`CdfError::BackendUnavailable`] when the selected backend is
    /// not compiled in or does not support `mode`, and the backend's own
    /// I/O or parse errors otherwise.
    pub fn open(self, path: &Path, mode: Mode) -> Result<Dataset, CdfError> {
        match self {
            Self::Classic => {
                if mode == Mode::ReadWrite {
                    return Err(CdfError::BackendUnavailable {
                        backend: self,
                        reason: String::from("the classic backend is read-only"),
                    });
                }
                classic::open(path)
            }
            #[cfg(feature = "netcdf4")]
            Self::NetCdf4 => netcdf4::open(path, mode),
            #[cfg(not(feature = "netcdf4"))]
            Self::NetCdf4 => Err(CdfError::BackendUnavailable {
                backend: self,
                reason: String::from("ncokit-cdf was built without the `netcdf4` feature"),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => f.write_str("classic"),
            Self::NetCdf4 => f.write_str("netcdf4"),
        }
    }
}
