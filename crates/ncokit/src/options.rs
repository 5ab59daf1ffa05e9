//! Serialization of keyword and raw options into command tokens.
//!
//! Keyword options are typed [`OptValue`]s rendered as `--key`,
//! `--key=value`, or `--key=a,b,c` tokens. Raw options ([`OptArg`]) are
//! merged ahead of keyword-derived tokens; raw strings are shell-tokenized
//! with `shell_words` before extension so `"-a 1 -b 2"` contributes four
//! independent tokens, and structured options render themselves.

use crate::custom::{Atted, CustomOption, Limit, Rename, RenderOption};
use crate::error::NcoError;

/// Typed value of a keyword option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptValue {
    /// Presence-only flag; `false` emits no token.
    Flag(bool),
    /// Integer value, rendered without a decimal point.
    Int(i64),
    /// Float value, rendered in its natural display form.
    Float(f64),
    /// String value.
    Str(String),
    /// Sequence value, rendered comma-joined.
    List(Vec<String>),
    /// Structured option rendering its own tokens; the key is ignored.
    Custom(CustomOption),
}

impl From<bool> for OptValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for OptValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for OptValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptValue {
    fn from(value: &str) -> Self {
        Self::Str(String::from(value))
    }
}

impl From<String> for OptValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<String>> for OptValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for OptValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(String::from).collect())
    }
}

impl From<CustomOption> for OptValue {
    fn from(value: CustomOption) -> Self {
        Self::Custom(value)
    }
}

impl From<Atted> for OptValue {
    fn from(value: Atted) -> Self {
        Self::Custom(value.into())
    }
}

impl From<Limit> for OptValue {
    fn from(value: Limit) -> Self {
        Self::Custom(value.into())
    }
}

impl From<Rename> for OptValue {
    fn from(value: Rename) -> Self {
        Self::Custom(value.into())
    }
}

/// One entry of the raw options list.
#[derive(Debug, Clone, PartialEq)]
pub enum OptArg {
    /// Raw text, shell-tokenized before extension.
    Raw(String),
    /// Structured option rendering its own tokens.
    Custom(CustomOption),
}

impl From<&str> for OptArg {
    fn from(value: &str) -> Self {
        Self::Raw(String::from(value))
    }
}

impl From<String> for OptArg {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<CustomOption> for OptArg {
    fn from(value: CustomOption) -> Self {
        Self::Custom(value)
    }
}

impl From<Atted> for OptArg {
    fn from(value: Atted) -> Self {
        Self::Custom(value.into())
    }
}

impl From<Limit> for OptArg {
    fn from(value: Limit) -> Self {
        Self::Custom(value.into())
    }
}

impl From<Rename> for OptArg {
    fn from(value: Rename) -> Self {
        Self::Custom(value.into())
    }
}

/// Renders one raw options entry into tokens.
///
/// # Errors
///
/// Returns [`NcoError::UnsupportedOption`] when a raw string cannot be
/// shell-tokenized (for example, an unterminated quote).
pub(crate) fn render_raw(arg: &OptArg) -> Result<Vec<String>, NcoError> {
    match arg {
        OptArg::Raw(text) => {
            shell_words::split(text).map_err(|err| NcoError::UnsupportedOption {
                key: text.clone(),
                reason: err.to_string(),
            })
        }
        OptArg::Custom(custom) => Ok(custom.tokens()),
    }
}

/// Renders one keyword option into tokens. A `false` flag renders nothing.
pub(crate) fn render_kwarg(key: &str, value: &OptValue) -> Vec<String> {
    match value {
        OptValue::Flag(true) => vec![format!("--{key}")],
        OptValue::Flag(false) => Vec::new(),
        OptValue::Int(v) => vec![format!("--{key}={v}")],
        OptValue::Float(v) => vec![format!("--{key}={v}")],
        OptValue::Str(v) => vec![format!("--{key}={v}")],
        OptValue::List(values) => vec![format!("--{key}={}", values.join(","))],
        OptValue::Custom(custom) => custom.tokens(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::{Atted, AttedMode, Limit};

    #[test]
    fn true_flag_renders_bare_switch() {
        assert_eq!(render_kwarg("overwrite", &OptValue::Flag(true)), vec!["--overwrite"]);
    }

    #[test]
    fn false_flag_renders_nothing() {
        assert!(render_kwarg("overwrite", &OptValue::Flag(false)).is_empty());
    }

    #[test]
    fn scalar_values_render_key_equals_value() {
        assert_eq!(render_kwarg("thr_nbr", &OptValue::Int(4)), vec!["--thr_nbr=4"]);
        assert_eq!(render_kwarg("scale", &OptValue::Float(1.5)), vec!["--scale=1.5"]);
        assert_eq!(
            render_kwarg("variable", &OptValue::from("random")),
            vec!["--variable=random"]
        );
    }

    #[test]
    fn integer_value_has_no_decimal_point() {
        assert_eq!(render_kwarg("lvl", &OptValue::Int(0)), vec!["--lvl=0"]);
    }

    #[test]
    fn list_value_renders_comma_joined() {
        assert_eq!(
            render_kwarg("variable", &OptValue::from(vec!["time", "random"])),
            vec!["--variable=time,random"]
        );
    }

    #[test]
    fn custom_value_renders_its_own_tokens() {
        let value = OptValue::from(Limit::range("time", 0, 10));
        assert_eq!(render_kwarg("ignored", &value), vec!["-d", "time,0,10"]);
    }

    #[test]
    fn raw_string_is_shell_tokenized() {
        let tokens = render_raw(&OptArg::from("-a 'units,time,o,c,days since 1999-01-01'"))
            .expect("tokenize");
        assert_eq!(tokens, vec!["-a", "units,time,o,c,days since 1999-01-01"]);
    }

    #[test]
    fn raw_string_with_unterminated_quote_is_rejected() {
        let err = render_raw(&OptArg::from("-a 'oops")).unwrap_err();
        assert!(matches!(err, NcoError::UnsupportedOption { .. }));
    }

    #[test]
    fn raw_custom_option_renders_inline() {
        let arg = OptArg::from(Atted::new(AttedMode::Overwrite, "units", "time", "noleap"));
        assert_eq!(
            render_raw(&arg).expect("render"),
            vec!["-a", "units,time,o,c,noleap"]
        );
    }
}
