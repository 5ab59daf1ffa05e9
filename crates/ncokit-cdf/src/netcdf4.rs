//! Fully-featured backend binding the system netCDF-C library.
//!
//! Maps a `netcdf` crate handle onto the same eager [`Dataset`] snapshot the
//! classic reader produces, so the engine never sees which backend served a
//! request. Handles netCDF-4/HDF5 files the classic reader cannot decode.

use std::path::Path;

use crate::error::CdfError;
use crate::model::{AttrValue, Attribute, Dataset, Dimension, NcType, Variable};
use crate::Mode;

pub(crate) fn open(path: &Path, mode: Mode) -> Result<Dataset, CdfError> {
    // The snapshot below is immutable either way; ReadWrite only asserts
    // that the file is writable, matching the library's open semantics.
    match mode {
        Mode::Read => {
            let file = netcdf::open(path).map_err(|err| map_err(path, &err))?;
            snapshot(path, &file)
        }
        Mode::ReadWrite => {
            let file = netcdf::append(path).map_err(|err| map_err(path, &err))?;
            snapshot(path, &file)
        }
    }
}

fn snapshot(path: &Path, file: &netcdf::File) -> Result<Dataset, CdfError> {
    let dims = file
        .dimensions()
        .map(|d| Dimension::new(d.name(), d.len(), d.is_unlimited()))
        .collect();

    let attrs = file
        .attributes()
        .map(|a| convert_attr(path, &a))
        .collect::<Result<Vec<_>, _>>()?;

    let mut vars = Vec::new();
    for var in file.variables() {
        let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
        let var_attrs = var
            .attributes()
            .map(|a| convert_attr(path, &a))
            .collect::<Result<Vec<_>, _>>()?;
        let data = var
            .get_values::<f64, _>(..)
            .map_err(|err| map_err(path, &err))?;
        vars.push(Variable::new(
            var.name(),
            convert_type(&var.vartype()),
            shape,
            var_attrs,
            data,
        ));
    }
    Ok(Dataset::new(dims, attrs, vars))
}

fn convert_type(vartype: &netcdf::types::VariableType) -> NcType {
    use netcdf::types::{BasicType, VariableType};
    match vartype {
        VariableType::Basic(basic) => match basic {
            BasicType::Byte | BasicType::Ubyte => NcType::Byte,
            BasicType::Char => NcType::Char,
            BasicType::Short | BasicType::Ushort => NcType::Short,
            BasicType::Int | BasicType::Uint => NcType::Int,
            BasicType::Float => NcType::Float,
            _ => NcType::Double,
        },
        _ => NcType::Double,
    }
}

fn convert_attr(path: &Path, attr: &netcdf::Attribute<'_>) -> Result<Attribute, CdfError> {
    use netcdf::AttributeValue as Av;
    let value = attr.value().map_err(|err| map_err(path, &err))?;
    let (dtype, decoded) = match value {
        Av::Str(text) => (NcType::Char, AttrValue::Text(text)),
        Av::Strs(texts) => (NcType::Char, AttrValue::Text(texts.join(","))),
        Av::Schar(v) => (NcType::Byte, AttrValue::Numeric(vec![f64::from(v)])),
        Av::Schars(v) => (
            NcType::Byte,
            AttrValue::Numeric(v.into_iter().map(f64::from).collect()),
        ),
        Av::Short(v) => (NcType::Short, AttrValue::Numeric(vec![f64::from(v)])),
        Av::Shorts(v) => (
            NcType::Short,
            AttrValue::Numeric(v.into_iter().map(f64::from).collect()),
        ),
        Av::Int(v) => (NcType::Int, AttrValue::Numeric(vec![f64::from(v)])),
        Av::Ints(v) => (
            NcType::Int,
            AttrValue::Numeric(v.into_iter().map(f64::from).collect()),
        ),
        Av::Float(v) => (NcType::Float, AttrValue::Numeric(vec![f64::from(v)])),
        Av::Floats(v) => (
            NcType::Float,
            AttrValue::Numeric(v.into_iter().map(f64::from).collect()),
        ),
        Av::Double(v) => (NcType::Double, AttrValue::Numeric(vec![v])),
        Av::Doubles(v) => (NcType::Double, AttrValue::Numeric(v)),
        other => (
            NcType::Double,
            AttrValue::Numeric(numeric_fallback(&other)),
        ),
    };
    Ok(Attribute::new(attr.name().to_owned(), dtype, decoded))
}

fn numeric_fallback(value: &netcdf::AttributeValue) -> Vec<f64> {
    use netcdf::AttributeValue as Av;
    match value {
        Av::Uchar(v) => vec![f64::from(*v)],
        Av::Uchars(v) => v.iter().map(|x| f64::from(*x)).collect(),
        Av::Ushort(v) => vec![f64::from(*v)],
        Av::Ushorts(v) => v.iter().map(|x| f64::from(*x)).collect(),
        Av::Uint(v) => vec![f64::from(*v)],
        Av::Uints(v) => v.iter().map(|x| f64::from(*x)).collect(),
        Av::Longlong(v) => vec![*v as f64],
        Av::Longlongs(v) => v.iter().map(|x| *x as f64).collect(),
        Av::Ulonglong(v) => vec![*v as f64],
        Av::Ulonglongs(v) => v.iter().map(|x| *x as f64).collect(),
        _ => Vec::new(),
    }
}

fn map_err(path: &Path, err: &netcdf::Error) -> CdfError {
    CdfError::Unsupported {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
