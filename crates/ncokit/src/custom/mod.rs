//! Structured builders for NCO's richer command-line switches.
//!
//! These wrap the option syntaxes users otherwise assemble by hand:
//!
//! - [`Atted`] — attribute edits, the `-a` switch of `ncatted`
//!   (`-a att_nm,var_nm,mode,att_typ,att_val`);
//! - [`Limit`] — hyperslab bounds, the `-d` switch
//!   (`-d dmn_nm,min,max,stride,subcycle`);
//! - [`Rename`] — the `-a`/`-v`/`-d`/`-g` switches of `ncrename`.
//!
//! Each renders itself into argv tokens through [`RenderOption`] and the
//! closed [`CustomOption`] variant set. Tokens are emitted bare, without
//! shell quoting; the invoker quotes defensively when shell mode is in
//! play.
//!
//! NCO distinguishes index bounds from coordinate bounds by the presence of
//! a decimal point, so [`LimitValue::Coord`] always renders one.

use std::fmt;

/// A value that renders itself into one or more argv tokens.
pub trait RenderOption {
    /// Command tokens for this option, in order.
    fn tokens(&self) -> Vec<String>;
}

/// Closed set of structured options the serializer accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomOption {
    /// Attribute edit (`ncatted -a`).
    Atted(Atted),
    /// Hyperslab limit (`-d`).
    Limit(Limit),
    /// Rename map (`ncrename`).
    Rename(Rename),
}

impl RenderOption for CustomOption {
    fn tokens(&self) -> Vec<String> {
        match self {
            Self::Atted(a) => a.tokens(),
            Self::Limit(l) => l.tokens(),
            Self::Rename(r) => r.tokens(),
        }
    }
}

impl From<Atted> for CustomOption {
    fn from(value: Atted) -> Self {
        Self::Atted(value)
    }
}

impl From<Limit> for CustomOption {
    fn from(value: Limit) -> Self {
        Self::Limit(value)
    }
}

impl From<Rename> for CustomOption {
    fn from(value: Rename) -> Self {
        Self::Rename(value)
    }
}

// ---------------------------------------------------------------------------
// Attribute edits
// ---------------------------------------------------------------------------

/// Edit mode of an attribute operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttedMode {
    /// Append to an existing attribute, creating it if absent.
    Append,
    /// Create the attribute; error if it exists.
    Create,
    /// Delete the attribute.
    Delete,
    /// Modify an existing attribute.
    Modify,
    /// Append only if the attribute does not yet exist.
    Nappend,
    /// Create or replace unconditionally.
    Overwrite,
}

impl AttedMode {
    /// Single-character mode code used on the command line.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Append => 'a',
            Self::Create => 'c',
            Self::Delete => 'd',
            Self::Modify => 'm',
            Self::Nappend => 'n',
            Self::Overwrite => 'o',
        }
    }
}

/// External type requested for an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttKind {
    /// 32-bit float (`f`).
    Float,
    /// 64-bit float (`d`).
    Double,
    /// 32-bit integer (`i`).
    Int,
    /// 16-bit integer (`s`).
    Short,
    /// Character data (`c`).
    Char,
    /// 8-bit integer (`b`).
    Byte,
    /// Unsigned 8-bit integer (`ub`).
    Ubyte,
    /// Unsigned 16-bit integer (`us`).
    Ushort,
    /// Unsigned 32-bit integer (`ui`).
    Uint,
    /// 64-bit integer (`ll`).
    Int64,
    /// Unsigned 64-bit integer (`ull`).
    Uint64,
    /// netCDF string type (`sng`).
    String,
}

impl AttKind {
    /// Type code used in the `-a` switch.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Float => "f",
            Self::Double => "d",
            Self::Int => "i",
            Self::Short => "s",
            Self::Char => "c",
            Self::Byte => "b",
            Self::Ubyte => "ub",
            Self::Ushort => "us",
            Self::Uint => "ui",
            Self::Int64 => "ll",
            Self::Uint64 => "ull",
            Self::String => "sng",
        }
    }

    const fn is_textual(self) -> bool {
        matches!(self, Self::Char | Self::String)
    }

    const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Short
                | Self::Byte
                | Self::Ubyte
                | Self::Ushort
                | Self::Uint
                | Self::Int64
                | Self::Uint64
        )
    }
}

/// Value carried by an attribute edit.
#[derive(Debug, Clone, PartialEq)]
pub enum AttedValue {
    /// Single text value.
    Text(String),
    /// List of text values.
    TextList(Vec<String>),
    /// Single integer.
    Int(i64),
    /// List of integers.
    IntList(Vec<i64>),
    /// Single float.
    Float(f64),
    /// List of floats.
    FloatList(Vec<f64>),
}

impl AttedValue {
    /// Default external type when the caller gave none: integers become
    /// `int`, floats `double`, single strings `char`, and string lists the
    /// netCDF `string` type.
    const fn default_kind(&self) -> AttKind {
        match self {
            Self::Text(_) => AttKind::Char,
            Self::TextList(_) => AttKind::String,
            Self::Int(_) | Self::IntList(_) => AttKind::Int,
            Self::Float(_) | Self::FloatList(_) => AttKind::Double,
        }
    }

    fn render(&self, kind: AttKind) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::TextList(texts) => texts.join(","),
            Self::Int(v) => render_number(f64_of(*v), kind),
            Self::IntList(values) => values
                .iter()
                .map(|v| render_number(f64_of(*v), kind))
                .collect::<Vec<_>>()
                .join(","),
            Self::Float(v) => render_number(*v, kind),
            Self::FloatList(values) => values
                .iter()
                .map(|v| render_number(*v, kind))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn f64_of(v: i64) -> f64 {
    v as f64
}

fn render_number(v: f64, kind: AttKind) -> String {
    if kind.is_integral() {
        format!("{}", v as i64)
    } else if kind.is_textual() {
        // Textual kinds carry the number's natural display form.
        if v.trunc() == v && v.is_finite() {
            format!("{}", v as i64)
        } else {
            format!("{v}")
        }
    } else {
        fmt_float(v)
    }
}

/// Renders a float with an explicit decimal point, as NCO expects for
/// coordinate (as opposed to index) values.
pub(crate) fn fmt_float(v: f64) -> String {
    if v.is_finite() && v.trunc() == v {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl From<&str> for AttedValue {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for AttedValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for AttedValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextList(value)
    }
}

impl From<Vec<&str>> for AttedValue {
    fn from(value: Vec<&str>) -> Self {
        Self::TextList(value.into_iter().map(String::from).collect())
    }
}

impl From<i64> for AttedValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttedValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Vec<i64>> for AttedValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntList(value)
    }
}

impl From<f64> for AttedValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<f64>> for AttedValue {
    fn from(value: Vec<f64>) -> Self {
        Self::FloatList(value)
    }
}

/// One attribute edit, rendering to `ncatted`'s `-a` switch.
#[derive(Debug, Clone, PartialEq)]
pub struct Atted {
    mode: AttedMode,
    att_name: String,
    var_name: String,
    value: Option<AttedValue>,
    kind: Option<AttKind>,
}

impl Atted {
    /// Builds an edit carrying a value.
    #[must_use]
    pub fn new(
        mode: AttedMode,
        att_name: impl Into<String>,
        var_name: impl Into<String>,
        value: impl Into<AttedValue>,
    ) -> Self {
        Self {
            mode,
            att_name: att_name.into(),
            var_name: var_name.into(),
            value: Some(value.into()),
            kind: None,
        }
    }

    /// Builds a delete edit, which carries no value or type.
    #[must_use]
    pub fn delete(att_name: impl Into<String>, var_name: impl Into<String>) -> Self {
        Self {
            mode: AttedMode::Delete,
            att_name: att_name.into(),
            var_name: var_name.into(),
            value: None,
            kind: None,
        }
    }

    /// Overrides the external type of the value.
    #[must_use]
    pub const fn with_kind(mut self, kind: AttKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn effective_kind(&self) -> Option<AttKind> {
        self.kind
            .or_else(|| self.value.as_ref().map(AttedValue::default_kind))
    }
}

impl RenderOption for Atted {
    fn tokens(&self) -> Vec<String> {
        if self.mode == AttedMode::Delete {
            return vec![
                String::from("-a"),
                format!("{},{},d,,", self.att_name, self.var_name),
            ];
        }
        let kind = self.effective_kind().unwrap_or(AttKind::Char);
        let rendered = self
            .value
            .as_ref()
            .map(|v| v.render(kind))
            .unwrap_or_default();
        vec![
            String::from("-a"),
            format!(
                "{},{},{},{},{}",
                self.att_name,
                self.var_name,
                self.mode.code(),
                kind.code(),
                rendered
            ),
        ]
    }
}

// ---------------------------------------------------------------------------
// Hyperslab limits
// ---------------------------------------------------------------------------

/// A hyperslab bound: an index (rendered without a decimal point) or a
/// coordinate (rendered with one).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitValue {
    /// Positional index.
    Index(i64),
    /// Coordinate value.
    Coord(f64),
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(v) => write!(f, "{v}"),
            Self::Coord(v) => f.write_str(&fmt_float(*v)),
        }
    }
}

impl From<i64> for LimitValue {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

impl From<i32> for LimitValue {
    fn from(value: i32) -> Self {
        Self::Index(i64::from(value))
    }
}

impl From<f64> for LimitValue {
    fn from(value: f64) -> Self {
        Self::Coord(value)
    }
}

/// A dimension-bounded subset, rendering to the `-d` switch.
///
/// The dimension name is mandatory; every bound is optional, but a useful
/// hyperslab carries at least one.
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    dim: String,
    min: Option<LimitValue>,
    max: Option<LimitValue>,
    stride: Option<i64>,
    subcycle: Option<i64>,
    single: bool,
}

impl Limit {
    /// Builds an empty limit over `dim`; add bounds with the builder
    /// methods.
    #[must_use]
    pub fn new(dim: impl Into<String>) -> Self {
        Self {
            dim: dim.into(),
            min: None,
            max: None,
            stride: None,
            subcycle: None,
            single: false,
        }
    }

    /// Builds a min/max range over `dim`.
    #[must_use]
    pub fn range(
        dim: impl Into<String>,
        min: impl Into<LimitValue>,
        max: impl Into<LimitValue>,
    ) -> Self {
        Self::new(dim).min(min).max(max)
    }

    /// Builds a single-point limit, rendered without a trailing comma so
    /// NCO reads it as one point rather than an open-ended range.
    #[must_use]
    pub fn single(dim: impl Into<String>, value: impl Into<LimitValue>) -> Self {
        let mut limit = Self::new(dim).min(value);
        limit.single = true;
        limit
    }

    /// Sets the lower bound.
    #[must_use]
    pub fn min(mut self, value: impl Into<LimitValue>) -> Self {
        self.min = Some(value.into());
        self
    }

    /// Sets the upper bound.
    #[must_use]
    pub fn max(mut self, value: impl Into<LimitValue>) -> Self {
        self.max = Some(value.into());
        self
    }

    /// Sets the stride.
    #[must_use]
    pub const fn stride(mut self, stride: i64) -> Self {
        self.stride = Some(stride);
        self
    }

    /// Sets the subcycle length.
    #[must_use]
    pub const fn subcycle(mut self, subcycle: i64) -> Self {
        self.subcycle = Some(subcycle);
        self
    }
}

impl RenderOption for Limit {
    fn tokens(&self) -> Vec<String> {
        let min = self.min.map(|v| v.to_string()).unwrap_or_default();
        if self.single {
            return vec![String::from("-d"), format!("{},{}", self.dim, min)];
        }
        let max = self.max.map(|v| v.to_string()).unwrap_or_default();
        let mut spec = format!("{},{},{}", self.dim, min, max);
        if let Some(subcycle) = self.subcycle {
            let stride = self.stride.map(|v| v.to_string()).unwrap_or_default();
            spec.push_str(&format!(",{stride},{subcycle}"));
        } else if let Some(stride) = self.stride {
            spec.push_str(&format!(",{stride}"));
        }
        vec![String::from("-d"), spec]
    }
}

// ---------------------------------------------------------------------------
// Renames
// ---------------------------------------------------------------------------

/// What kind of object an `ncrename` invocation renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameKind {
    /// Rename attributes (`-a`).
    Attribute,
    /// Rename dimensions (`-d`).
    Dimension,
    /// Rename groups (`-g`).
    Group,
    /// Rename variables (`-v`).
    Variable,
}

impl RenameKind {
    /// Switch character for this kind.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Attribute => 'a',
            Self::Dimension => 'd',
            Self::Group => 'g',
            Self::Variable => 'v',
        }
    }
}

/// An old-name to new-name mapping, rendering one switch pair per entry.
/// Entries render in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    kind: RenameKind,
    pairs: Vec<(String, String)>,
}

impl Rename {
    /// Builds an empty rename of the given kind.
    #[must_use]
    pub const fn new(kind: RenameKind) -> Self {
        Self {
            kind,
            pairs: Vec::new(),
        }
    }

    /// Adds one old-name to new-name entry.
    #[must_use]
    pub fn map(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.pairs.push((old.into(), new.into()));
        self
    }
}

impl RenderOption for Rename {
    fn tokens(&self) -> Vec<String> {
        let switch = format!("-{}", self.kind.code());
        let mut tokens = Vec::with_capacity(self.pairs.len() * 2);
        for (old, new) in &self.pairs {
            tokens.push(switch.clone());
            tokens.push(format!("{old},{new}"));
        }
        tokens
    }
}

#[cfg(test)]
mod tests;
