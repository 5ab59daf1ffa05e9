//! Pure-Rust reader for the netCDF classic formats.
//!
//! Decodes CDF-1 ("classic") and CDF-2 ("64-bit offset") files into a
//! [`Dataset`]. The whole file is read eagerly; variables are widened to
//! `f64` on decode. Record variables are supported; the streaming numrecs
//! sentinel is not.
//!
//! Format reference: the netCDF classic file format specification
//! (`magic numrecs dim_list gatt_list var_list data`), all integers
//! big-endian, names and value blocks padded to four-byte boundaries.

use std::fs;
use std::path::Path;

use crate::error::CdfError;
use crate::model::{AttrValue, Attribute, Dataset, Dimension, NcType, Variable};

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;
const NUMRECS_STREAMING: u32 = 0xFFFF_FFFF;

/// Opens and fully decodes a classic-format file.
///
/// # Errors
///
/// Returns [`CdfError::BadMagic`] for non-netCDF files, [`CdfError::Parse`]
/// for malformed headers or truncated data, and [`CdfError::Unsupported`]
/// for classic features this reader does not decode (streaming record
/// counts).
pub fn open(path: &Path) -> Result<Dataset, CdfError> {
    let buf = fs::read(path).map_err(|source| CdfError::io(path, source))?;
    Decoder {
        path,
        buf: &buf,
        pos: 0,
        wide_offsets: false,
    }
    .decode()
}

struct Decoder<'a> {
    path: &'a Path,
    buf: &'a [u8],
    pos: usize,
    wide_offsets: bool,
}

/// Header entry for a variable before its data section is decoded.
struct RawVar {
    name: String,
    dim_ids: Vec<usize>,
    attrs: Vec<Attribute>,
    dtype: NcType,
    begin: usize,
}

impl Decoder<'_> {
    fn decode(mut self) -> Result<Dataset, CdfError> {
        self.magic()?;
        let numrecs = self.u32()?;
        if numrecs == NUMRECS_STREAMING {
            return Err(self.unsupported("streaming record count"));
        }
        let numrecs = numrecs as usize;

        let dims = self.dim_list(numrecs)?;
        let global_attrs = self.attr_list()?;
        let raw_vars = self.var_list(&dims)?;

        let mut vars = Vec::with_capacity(raw_vars.len());
        let record_dim = dims.iter().position(Dimension::is_record);
        let record_stride = self.record_stride(&raw_vars, &dims, record_dim);
        for raw in raw_vars {
            vars.push(self.read_var(raw, &dims, record_dim, numrecs, record_stride)?);
        }
        Ok(Dataset::new(dims, global_attrs, vars))
    }

    fn magic(&mut self) -> Result<(), CdfError> {
        let header = self.take(4)?;
        if &header[0..3] != b"CDF" {
            return Err(CdfError::BadMagic {
                path: self.path.to_path_buf(),
            });
        }
        self.wide_offsets = match header[3] {
            1 => false,
            2 => true,
            _ => {
                return Err(CdfError::BadMagic {
                    path: self.path.to_path_buf(),
                });
            }
        };
        Ok(())
    }

    fn dim_list(&mut self, numrecs: usize) -> Result<Vec<Dimension>, CdfError> {
        let count = self.tagged_count(NC_DIMENSION)?;
        let mut dims = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let len = self.u32()? as usize;
            let is_record = len == 0;
            let len = if is_record { numrecs } else { len };
            dims.push(Dimension::new(name, len, is_record));
        }
        if dims.iter().filter(|d| d.is_record()).count() > 1 {
            return Err(self.parse_err("more than one record dimension"));
        }
        Ok(dims)
    }

    fn attr_list(&mut self) -> Result<Vec<Attribute>, CdfError> {
        let count = self.tagged_count(NC_ATTRIBUTE)?;
        let mut attrs = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let dtype = self.nc_type()?;
            let nelems = self.u32()? as usize;
            let value = if dtype == NcType::Char {
                let bytes = self.take(nelems)?;
                let text = String::from_utf8_lossy(bytes).into_owned();
                AttrValue::Text(text)
            } else {
                let mut values = Vec::with_capacity(nelems);
                for _ in 0..nelems {
                    values.push(self.element(dtype)?);
                }
                AttrValue::Numeric(values)
            };
            self.skip_padding(nelems * dtype.size())?;
            attrs.push(Attribute::new(name, dtype, value));
        }
        Ok(attrs)
    }

    fn var_list(&mut self, dims: &[Dimension]) -> Result<Vec<RawVar>, CdfError> {
        let count = self.tagged_count(NC_VARIABLE)?;
        let mut vars = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.name()?;
            let ndims = self.u32()? as usize;
            let mut dim_ids = Vec::with_capacity(ndims);
            for _ in 0..ndims {
                let id = self.u32()? as usize;
                if id >= dims.len() {
                    return Err(self.parse_err("dimension id out of range"));
                }
                dim_ids.push(id);
            }
            let attrs = self.attr_list()?;
            let dtype = self.nc_type()?;
            let _vsize = self.u32()?;
            let begin = self.offset()?;
            vars.push(RawVar {
                name,
                dim_ids,
                attrs,
                dtype,
                begin,
            });
        }
        Ok(vars)
    }

    /// Byte stride between consecutive records.
    ///
    /// Each record variable contributes one record's worth of data padded to
    /// four bytes, except when the file holds exactly one record variable,
    /// in which case its slab is packed without padding.
    fn record_stride(
        &self,
        raw_vars: &[RawVar],
        dims: &[Dimension],
        record_dim: Option<usize>,
    ) -> usize {
        let Some(record_dim) = record_dim else {
            return 0;
        };
        let slabs: Vec<usize> = raw_vars
            .iter()
            .filter(|v| v.dim_ids.first() == Some(&record_dim))
            .map(|v| {
                let count: usize = v.dim_ids[1..]
                    .iter()
                    .map(|id| dims[*id].len())
                    .product();
                count * v.dtype.size()
            })
            .collect();
        match slabs.as_slice() {
            [single] => *single,
            many => many.iter().map(|s| pad4(*s)).sum(),
        }
    }

    fn read_var(
        &self,
        raw: RawVar,
        dims: &[Dimension],
        record_dim: Option<usize>,
        numrecs: usize,
        record_stride: usize,
    ) -> Result<Variable, CdfError> {
        let is_record = record_dim.is_some() && raw.dim_ids.first() == record_dim.as_ref();
        let shape: Vec<usize> = raw.dim_ids.iter().map(|id| dims[*id].len()).collect();

        let data = if is_record {
            let per_record: usize = shape[1..].iter().product();
            let mut data = Vec::with_capacity(per_record * numrecs);
            for rec in 0..numrecs {
                let start = raw.begin + rec * record_stride;
                self.read_slab(start, per_record, raw.dtype, &mut data)?;
            }
            data
        } else {
            let count: usize = shape.iter().product();
            let mut data = Vec::with_capacity(count);
            self.read_slab(raw.begin, count, raw.dtype, &mut data)?;
            data
        };

        Ok(Variable::new(raw.name, raw.dtype, shape, raw.attrs, data))
    }

    fn read_slab(
        &self,
        start: usize,
        count: usize,
        dtype: NcType,
        out: &mut Vec<f64>,
    ) -> Result<(), CdfError> {
        let end = start + count * dtype.size();
        if end > self.buf.len() {
            return Err(CdfError::Parse {
                path: self.path.to_path_buf(),
                offset: start,
                message: String::from("variable data extends past end of file"),
            });
        }
        let mut cursor = Decoder {
            path: self.path,
            buf: self.buf,
            pos: start,
            wide_offsets: self.wide_offsets,
        };
        for _ in 0..count {
            out.push(cursor.element(dtype)?);
        }
        Ok(())
    }

    // --- primitive readers -------------------------------------------------

    fn take(&mut self, n: usize) -> Result<&[u8], CdfError> {
        if self.pos + n > self.buf.len() {
            return Err(self.parse_err("unexpected end of file"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, CdfError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn offset(&mut self) -> Result<usize, CdfError> {
        if self.wide_offsets {
            let bytes = self.take(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            let value = u64::from_be_bytes(raw);
            usize::try_from(value).map_err(|_| self.parse_err("offset exceeds address space"))
        } else {
            Ok(self.u32()? as usize)
        }
    }

    fn name(&mut self) -> Result<String, CdfError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        let name = String::from_utf8_lossy(bytes).into_owned();
        self.skip_padding(len)?;
        Ok(name)
    }

    fn nc_type(&mut self) -> Result<NcType, CdfError> {
        let code = self.u32()?;
        NcType::from_code(code).ok_or_else(|| self.parse_err("unknown external type code"))
    }

    fn tagged_count(&mut self, expected_tag: u32) -> Result<usize, CdfError> {
        let tag = self.u32()?;
        let count = self.u32()? as usize;
        // An absent list is encoded as two zero words.
        if tag == 0 && count == 0 {
            return Ok(0);
        }
        if tag != expected_tag {
            return Err(self.parse_err("unexpected list tag"));
        }
        Ok(count)
    }

    fn element(&mut self, dtype: NcType) -> Result<f64, CdfError> {
        let value = match dtype {
            NcType::Byte => f64::from(self.take(1)?[0] as i8),
            NcType::Char => f64::from(self.take(1)?[0]),
            NcType::Short => {
                let b = self.take(2)?;
                f64::from(i16::from_be_bytes([b[0], b[1]]))
            }
            NcType::Int => {
                let b = self.take(4)?;
                f64::from(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            NcType::Float => {
                let b = self.take(4)?;
                f64::from(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            NcType::Double => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                f64::from_be_bytes(raw)
            }
        };
        Ok(value)
    }

    fn skip_padding(&mut self, unpadded: usize) -> Result<(), CdfError> {
        let padding = pad4(unpadded) - unpadded;
        if padding > 0 {
            let _ = self.take(padding)?;
        }
        Ok(())
    }

    fn parse_err(&self, message: &str) -> CdfError {
        CdfError::Parse {
            path: self.path.to_path_buf(),
            offset: self.pos,
            message: String::from(message),
        }
    }

    fn unsupported(&self, message: &str) -> CdfError {
        CdfError::Unsupported {
            path: self.path.to_path_buf(),
            message: String::from(message),
        }
    }
}

/// Rounds `n` up to the next four-byte boundary.
const fn pad4(n: usize) -> usize {
    n.div_ceil(4) * 4
}
