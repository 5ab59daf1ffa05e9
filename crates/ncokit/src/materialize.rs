//! Materializes finished call outputs as arrays, masked arrays, or open
//! dataset handles.

use camino::{Utf8Path, Utf8PathBuf};
use ncokit_cdf::{Array, Dataset, MaskedArray};
use ncokit_cdf::{Backend, Mode};

use crate::error::NcoError;

const MATERIALIZE_TARGET: &str = "ncokit::materialize";

/// What a finished call hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    /// Captured standard output of a printing invocation.
    Stdout(Vec<u8>),
    /// Path of the written (or modified in place) file.
    Path(Utf8PathBuf),
    /// The output opened as a dataset.
    Handle(Dataset),
    /// One variable of the output, read into a dense array.
    Array(Array),
    /// One variable with its fill values masked out.
    MaskedArray(MaskedArray),
}

impl CallOutput {
    /// The output path, when the call produced one.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }
}

/// Which richer-than-path shape, if any, the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnShape {
    /// Read this variable into a dense array.
    pub array: Option<String>,
    /// Read this variable and mask its fill values.
    pub masked_array: Option<String>,
    /// Open the whole output as a dataset handle.
    pub handle: bool,
}

impl ReturnShape {
    pub(crate) const fn requests_any(&self) -> bool {
        self.array.is_some() || self.masked_array.is_some() || self.handle
    }

    fn request_count(&self) -> usize {
        usize::from(self.array.is_some())
            + usize::from(self.masked_array.is_some())
            + usize::from(self.handle)
    }
}

/// Turns the written output at `path` into the requested shape.
///
/// When more than one shape is requested the richest wins (array over
/// masked array over handle) and a warning is logged; with none requested
/// the path itself is returned.
///
/// # Errors
///
/// Returns [`NcoError::VariableNotFound`] when the requested variable is
/// absent, or [`NcoError::Backend`] when the file cannot be read.
pub(crate) fn materialize(
    backend: Backend,
    path: Utf8PathBuf,
    shape: &ReturnShape,
) -> Result<CallOutput, NcoError> {
    if !shape.requests_any() {
        return Ok(CallOutput::Path(path));
    }
    if shape.request_count() > 1 {
        tracing::warn!(
            target: MATERIALIZE_TARGET,
            path = %path,
            "multiple return shapes requested; honouring the richest"
        );
    }

    let dataset = backend.open(path.as_std_path(), Mode::Read)?;
    if let Some(name) = &shape.array {
        let variable = lookup(&dataset, name, &path)?;
        return Ok(CallOutput::Array(variable.to_array()));
    }
    if let Some(name) = &shape.masked_array {
        let variable = lookup(&dataset, name, &path)?;
        let fill = variable.fill_value();
        return Ok(CallOutput::MaskedArray(MaskedArray::from_fill_value(
            variable.to_array(),
            fill,
        )));
    }
    Ok(CallOutput::Handle(dataset))
}

fn lookup<'a>(
    dataset: &'a Dataset,
    name: &str,
    path: &Utf8Path,
) -> Result<&'a ncokit_cdf::Variable, NcoError> {
    dataset
        .variable(name)
        .ok_or_else(|| NcoError::VariableNotFound {
            name: name.to_owned(),
            path: path.as_std_path().to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use ncokit_cdf::NcType;
    use ncokit_cdf::writer::{numeric_attr, ClassicWriter};
    use tempfile::TempDir;

    use super::*;

    fn sample_file(dir: &TempDir) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("sample.nc")).expect("utf8 path");
        let mut writer = ClassicWriter::new();
        let x = writer.add_dimension("x", 3);
        let temp = writer.add_variable("temperature", &[x], NcType::Double, vec![1.0, -999.0, 3.0]);
        writer.variable_attribute(temp, numeric_attr("_FillValue", NcType::Double, vec![-999.0]));
        writer.write_to(path.as_std_path()).expect("write file");
        path
    }

    #[test]
    fn no_request_returns_the_path() {
        let out = materialize(
            Backend::Classic,
            Utf8PathBuf::from("/tmp/unused.nc"),
            &ReturnShape::default(),
        )
        .expect("path passthrough");
        assert_eq!(out.path(), Some(Utf8Path::new("/tmp/unused.nc")));
    }

    #[test]
    fn array_request_reads_the_variable() {
        let dir = TempDir::new().expect("temp dir");
        let path = sample_file(&dir);
        let shape = ReturnShape {
            array: Some(String::from("temperature")),
            ..ReturnShape::default()
        };
        let out = materialize(Backend::Classic, path, &shape).expect("materialize array");
        let CallOutput::Array(array) = out else {
            panic!("expected an array");
        };
        assert_eq!(array.values(), &[1.0, -999.0, 3.0]);
    }

    #[test]
    fn masked_request_masks_fill_values() {
        let dir = TempDir::new().expect("temp dir");
        let path = sample_file(&dir);
        let shape = ReturnShape {
            masked_array: Some(String::from("temperature")),
            ..ReturnShape::default()
        };
        let out = materialize(Backend::Classic, path, &shape).expect("materialize masked");
        let CallOutput::MaskedArray(masked) = out else {
            panic!("expected a masked array");
        };
        assert_eq!(masked.mask(), &[false, true, false]);
    }

    #[test]
    fn array_wins_over_masked_and_handle() {
        let dir = TempDir::new().expect("temp dir");
        let path = sample_file(&dir);
        let shape = ReturnShape {
            array: Some(String::from("temperature")),
            masked_array: Some(String::from("temperature")),
            handle: true,
        };
        let out = materialize(Backend::Classic, path, &shape).expect("materialize");
        assert!(matches!(out, CallOutput::Array(_)));
    }

    #[test]
    fn handle_request_opens_the_dataset() {
        let dir = TempDir::new().expect("temp dir");
        let path = sample_file(&dir);
        let shape = ReturnShape {
            handle: true,
            ..ReturnShape::default()
        };
        let out = materialize(Backend::Classic, path, &shape).expect("materialize handle");
        let CallOutput::Handle(dataset) = out else {
            panic!("expected a handle");
        };
        assert!(dataset.variable("temperature").is_some());
    }

    #[test]
    fn missing_variable_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        let path = sample_file(&dir);
        let shape = ReturnShape {
            array: Some(String::from("pressure")),
            ..ReturnShape::default()
        };
        let err = materialize(Backend::Classic, path, &shape).expect_err("missing variable");
        assert!(matches!(err, NcoError::VariableNotFound { name, .. } if name == "pressure"));
    }
}
