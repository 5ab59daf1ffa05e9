//! Minimal classic-format (CDF-1) writer for test suites.
//!
//! Only what tests need: fixed-size dimensions, global and per-variable
//! attributes, and variables of any classic type supplied as `f64` values
//! narrowed on write. Record dimensions are out of scope.
//!
//! Compiled for this crate's own tests and for dependents that enable the
//! `test-support` feature.

use std::fs;
use std::path::Path;

use crate::error::CdfError;
use crate::model::{AttrValue, Attribute, NcType};

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

/// Builder for a classic-format file.
#[derive(Debug, Default)]
pub struct ClassicWriter {
    dims: Vec<(String, usize)>,
    attrs: Vec<Attribute>,
    vars: Vec<VarSpec>,
}

#[derive(Debug)]
struct VarSpec {
    name: String,
    dim_ids: Vec<usize>,
    dtype: NcType,
    attrs: Vec<Attribute>,
    data: Vec<f64>,
}

impl ClassicWriter {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fixed dimension and returns its id.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> usize {
        self.dims.push((String::from(name), len));
        self.dims.len() - 1
    }

    /// Adds a global attribute.
    pub fn global_attribute(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    /// Adds a variable over the given dimension ids and returns its index.
    /// `data` is row-major and narrowed to `dtype` on write.
    pub fn add_variable(
        &mut self,
        name: &str,
        dim_ids: &[usize],
        dtype: NcType,
        data: Vec<f64>,
    ) -> usize {
        self.vars.push(VarSpec {
            name: String::from(name),
            dim_ids: dim_ids.to_vec(),
            dtype,
            attrs: Vec::new(),
            data,
        });
        self.vars.len() - 1
    }

    /// Attaches an attribute to the variable at `var_index`.
    pub fn variable_attribute(&mut self, var_index: usize, attr: Attribute) {
        if let Some(var) = self.vars.get_mut(var_index) {
            var.attrs.push(attr);
        }
    }

    /// Serialises the file to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CdfError::Unsupported`] when a variable's data length does
    /// not match its shape or references an unknown dimension, and
    /// [`CdfError::Io`] when the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), CdfError> {
        self.validate(path)?;

        // Header length is independent of the begin offsets (fixed-width
        // u32 fields), so serialise once with zeros to measure, then again
        // with real offsets.
        let probe = self.header(&vec![0; self.vars.len()]);
        let mut begins = Vec::with_capacity(self.vars.len());
        let mut cursor = probe.len();
        for var in &self.vars {
            begins.push(cursor);
            cursor += pad4(var.data.len() * var.dtype.size());
        }

        let mut out = self.header(&begins);
        for var in &self.vars {
            let start = out.len();
            for value in &var.data {
                put_element(&mut out, var.dtype, *value);
            }
            let written = out.len() - start;
            pad_to4(&mut out, written);
        }
        fs::write(path, out).map_err(|source| CdfError::io(path, source))
    }

    fn validate(&self, path: &Path) -> Result<(), CdfError> {
        for var in &self.vars {
            let mut count = 1usize;
            for id in &var.dim_ids {
                let Some((_, len)) = self.dims.get(*id) else {
                    return Err(CdfError::Unsupported {
                        path: path.to_path_buf(),
                        message: format!("variable '{}' references unknown dimension", var.name),
                    });
                };
                count *= *len;
            }
            if count != var.data.len() {
                return Err(CdfError::Unsupported {
                    path: path.to_path_buf(),
                    message: format!(
                        "variable '{}' has {} values for shape of {}",
                        var.name,
                        var.data.len(),
                        count
                    ),
                });
            }
        }
        Ok(())
    }

    fn header(&self, begins: &[usize]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"CDF\x01");
        put_u32(&mut out, 0); // numrecs

        put_list_header(&mut out, NC_DIMENSION, self.dims.len());
        for (name, len) in &self.dims {
            put_name(&mut out, name);
            put_u32(&mut out, *len as u32);
        }

        put_attr_list(&mut out, &self.attrs);

        put_list_header(&mut out, NC_VARIABLE, self.vars.len());
        for (var, begin) in self.vars.iter().zip(begins) {
            put_name(&mut out, &var.name);
            put_u32(&mut out, var.dim_ids.len() as u32);
            for id in &var.dim_ids {
                put_u32(&mut out, *id as u32);
            }
            put_attr_list(&mut out, &var.attrs);
            put_u32(&mut out, var.dtype.code());
            put_u32(&mut out, pad4(var.data.len() * var.dtype.size()) as u32);
            put_u32(&mut out, *begin as u32);
        }
        out
    }
}

/// Convenience constructor for a character attribute.
#[must_use]
pub fn text_attr(name: &str, value: &str) -> Attribute {
    Attribute::new(
        String::from(name),
        NcType::Char,
        AttrValue::Text(String::from(value)),
    )
}

/// Convenience constructor for a numeric attribute.
#[must_use]
pub fn numeric_attr(name: &str, dtype: NcType, values: Vec<f64>) -> Attribute {
    Attribute::new(String::from(name), dtype, AttrValue::Numeric(values))
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_name(out: &mut Vec<u8>, name: &str) {
    put_u32(out, name.len() as u32);
    out.extend_from_slice(name.as_bytes());
    pad_to4(out, name.len());
}

fn put_list_header(out: &mut Vec<u8>, tag: u32, count: usize) {
    if count == 0 {
        put_u32(out, 0);
        put_u32(out, 0);
    } else {
        put_u32(out, tag);
        put_u32(out, count as u32);
    }
}

fn put_attr_list(out: &mut Vec<u8>, attrs: &[Attribute]) {
    put_list_header(out, NC_ATTRIBUTE, attrs.len());
    for attr in attrs {
        put_name(out, attr.name());
        match attr.value() {
            AttrValue::Text(text) => {
                put_u32(out, NcType::Char.code());
                put_u32(out, text.len() as u32);
                out.extend_from_slice(text.as_bytes());
                pad_to4(out, text.len());
            }
            AttrValue::Numeric(values) => {
                put_u32(out, attr.dtype().code());
                put_u32(out, values.len() as u32);
                let start = out.len();
                for value in values {
                    put_element(out, attr.dtype(), *value);
                }
                pad_to4(out, out.len() - start);
            }
        }
    }
}

fn put_element(out: &mut Vec<u8>, dtype: NcType, value: f64) {
    match dtype {
        NcType::Byte => out.push(value as i8 as u8),
        NcType::Char => out.push(value as u8),
        NcType::Short => out.extend_from_slice(&(value as i16).to_be_bytes()),
        NcType::Int => out.extend_from_slice(&(value as i32).to_be_bytes()),
        NcType::Float => out.extend_from_slice(&(value as f32).to_be_bytes()),
        NcType::Double => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn pad_to4(out: &mut Vec<u8>, unpadded: usize) {
    for _ in 0..(pad4(unpadded) - unpadded) {
        out.push(0);
    }
}

const fn pad4(n: usize) -> usize {
    n.div_ceil(4) * 4
}
