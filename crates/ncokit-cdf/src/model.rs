//! In-memory model of a decoded dataset.
//!
//! A [`Dataset`] is an eagerly decoded snapshot of a file: dimensions,
//! global attributes, and variables whose contents are held as `f64`
//! regardless of their on-disk type. That widening is deliberate: the
//! dispatch engine only ever hands values back to callers as dense numeric
//! arrays, and every classic netCDF type is exactly representable in an
//! `f64` except the extreme range of 64-bit integers, which the classic
//! formats do not carry.

use std::fmt;

/// External (on-disk) type of a variable or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NcType {
    /// 8-bit signed integer.
    Byte,
    /// 8-bit character.
    Char,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
}

impl NcType {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Byte | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// On-disk type code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Char => 2,
            Self::Short => 3,
            Self::Int => 4,
            Self::Float => 5,
            Self::Double => 6,
        }
    }

    /// Maps an on-disk type code back to a type, if known.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Byte),
            2 => Some(Self::Char),
            3 => Some(Self::Short),
            4 => Some(Self::Int),
            5 => Some(Self::Float),
            6 => Some(Self::Double),
            _ => None,
        }
    }
}

impl fmt::Display for NcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
        };
        f.write_str(name)
    }
}

/// Decoded value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Character attribute decoded as text.
    Text(String),
    /// Numeric attribute widened to `f64`.
    Numeric(Vec<f64>),
}

/// A named attribute attached to a variable or to the dataset itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    dtype: NcType,
    value: AttrValue,
}

impl Attribute {
    /// Builds an attribute from its parts.
    #[must_use]
    pub const fn new(name: String, dtype: NcType, value: AttrValue) -> Self {
        Self { name, dtype, value }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk type of the attribute.
    #[must_use]
    pub const fn dtype(&self) -> NcType {
        self.dtype
    }

    /// Decoded value.
    #[must_use]
    pub const fn value(&self) -> &AttrValue {
        &self.value
    }

    /// First numeric element, if the attribute is numeric and non-empty.
    #[must_use]
    pub fn first_numeric(&self) -> Option<f64> {
        match &self.value {
            AttrValue::Numeric(values) => values.first().copied(),
            AttrValue::Text(_) => None,
        }
    }
}

/// A named dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    len: usize,
    is_record: bool,
}

impl Dimension {
    pub(crate) const fn new(name: String, len: usize, is_record: bool) -> Self {
        Self {
            name,
            len,
            is_record,
        }
    }

    /// Dimension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension length. For the record dimension this is the number of
    /// records present when the file was read.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the dimension has zero length.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this is the unlimited (record) dimension.
    #[must_use]
    pub const fn is_record(&self) -> bool {
        self.is_record
    }
}

/// A variable with its dense contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    dtype: NcType,
    shape: Vec<usize>,
    attrs: Vec<Attribute>,
    data: Vec<f64>,
}

impl Variable {
    pub(crate) const fn new(
        name: String,
        dtype: NcType,
        shape: Vec<usize>,
        attrs: Vec<Attribute>,
        data: Vec<f64>,
    ) -> Self {
        Self {
            name,
            dtype,
            shape,
            attrs,
            data,
        }
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk element type.
    #[must_use]
    pub const fn dtype(&self) -> NcType {
        self.dtype
    }

    /// Dimension lengths, outermost first.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// All attributes, in file order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name() == name)
    }

    /// Numeric `_FillValue` attribute, when declared.
    #[must_use]
    pub fn fill_value(&self) -> Option<f64> {
        self.attribute("_FillValue")
            .and_then(Attribute::first_numeric)
    }

    /// Dense contents in row-major order, widened to `f64`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Copies the contents into a standalone [`Array`].
    #[must_use]
    pub fn to_array(&self) -> Array {
        Array::new(self.shape.clone(), self.data.clone())
    }
}

/// An open dataset handle: dimensions, global attributes, and variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    dims: Vec<Dimension>,
    attrs: Vec<Attribute>,
    vars: Vec<Variable>,
}

impl Dataset {
    pub(crate) const fn new(
        dims: Vec<Dimension>,
        attrs: Vec<Attribute>,
        vars: Vec<Variable>,
    ) -> Self {
        Self { dims, attrs, vars }
    }

    /// All dimensions, in file order.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dims
    }

    /// All global attributes, in file order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Looks up a global attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name() == name)
    }

    /// All variables, in file order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name() == name)
    }
}

/// Dense numeric array: a shape and row-major `f64` contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Array {
    /// Builds an array from a shape and row-major data.
    #[must_use]
    pub const fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
        Self { shape, data }
    }

    /// Dimension lengths, outermost first.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major contents.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array has no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Dense array paired with a validity mask derived from a fill value.
///
/// `mask[i]` is `true` when element `i` equals the variable's `_FillValue`
/// and should be treated as missing. A variable without a fill value yields
/// an all-`false` (all-valid) mask.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    array: Array,
    mask: Vec<bool>,
}

impl MaskedArray {
    /// Builds a masked view of `array` marking elements equal to
    /// `fill_value` as missing. `None` yields an all-valid mask.
    #[must_use]
    pub fn from_fill_value(array: Array, fill_value: Option<f64>) -> Self {
        let mask = match fill_value {
            Some(fill) => array.values().iter().map(|v| *v == fill).collect(),
            None => vec![false; array.len()],
        };
        Self { array, mask }
    }

    /// The underlying dense array.
    #[must_use]
    pub const fn array(&self) -> &Array {
        &self.array
    }

    /// Validity mask; `true` marks a missing element.
    #[must_use]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Whether any element is masked.
    #[must_use]
    pub fn any_masked(&self) -> bool {
        self.mask.iter().any(|m| *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_with_fill(fill: Option<f64>) -> Variable {
        let mut attrs = Vec::new();
        if let Some(fill) = fill {
            attrs.push(Attribute::new(
                String::from("_FillValue"),
                NcType::Double,
                AttrValue::Numeric(vec![fill]),
            ));
        }
        Variable::new(
            String::from("t"),
            NcType::Double,
            vec![4],
            attrs,
            vec![1.0, -999.0, 3.0, 4.0],
        )
    }

    #[test]
    fn fill_value_lookup() {
        assert_eq!(var_with_fill(Some(-999.0)).fill_value(), Some(-999.0));
        assert_eq!(var_with_fill(None).fill_value(), None);
    }

    #[test]
    fn masked_array_marks_exactly_fill_elements() {
        let var = var_with_fill(Some(-999.0));
        let masked = MaskedArray::from_fill_value(var.to_array(), var.fill_value());
        assert_eq!(masked.mask(), &[false, true, false, false]);
        assert!(masked.any_masked());
    }

    #[test]
    fn missing_fill_value_yields_all_valid_mask() {
        let var = var_with_fill(None);
        let masked = MaskedArray::from_fill_value(var.to_array(), var.fill_value());
        assert!(!masked.any_masked());
        assert_eq!(masked.mask().len(), 4);
    }

    #[test]
    fn text_attribute_has_no_numeric_value() {
        let attr = Attribute::new(
            String::from("units"),
            NcType::Char,
            AttrValue::Text(String::from("K")),
        );
        assert_eq!(attr.first_numeric(), None);
    }

    #[test]
    fn nc_type_codes_round_trip() {
        for t in [
            NcType::Byte,
            NcType::Char,
            NcType::Short,
            NcType::Int,
            NcType::Float,
            NcType::Double,
        ] {
            assert_eq!(NcType::from_code(t.code()), Some(t));
        }
        assert_eq!(NcType::from_code(0), None);
        assert_eq!(NcType::from_code(7), None);
    }
}
