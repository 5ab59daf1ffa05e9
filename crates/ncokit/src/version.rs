//! Probing and ordering of the installed NCO toolkit's version.
//!
//! NCO reports its version on standard error in one of two formats, with
//! and without quotation marks around the number:
//!
//! ```text
//! NCO netCDF Operators version 4.5.4 (http://nco.sf.net) ...
//! NCO netCDF Operators version "4.5.4" (http://nco.sf.net) ...
//! ```
//!
//! Versions are ordered with `semver`; short numbers are padded to three
//! components before parsing. The dispatcher consults the version only for
//! the append-mode print-pattern switch (see the output classifier).

use std::sync::OnceLock;

use camino::Utf8Path;
use regex::Regex;
use semver::Version;

use crate::error::NcoError;
use crate::invoke::Invoker;

/// Version at and above which `ncks` append operations stop overloading
/// the metadata print flags.
pub(crate) fn append_print_threshold() -> Version {
    Version::new(4, 3, 7)
}

/// Runs `ncra --version` from `toolkit_dir` and parses the reported
/// version.
///
/// # Errors
///
/// Returns invocation errors from running the binary, and
/// [`NcoError::VersionUnknown`] when the output matches neither known
/// format.
pub fn probe(toolkit_dir: &Utf8Path) -> Result<Version, NcoError> {
    let binary = toolkit_dir.join("ncra");
    let tokens = vec![binary.into_string(), String::from("--version")];
    let out = Invoker::new().run("ncra", &tokens, &[], false)?;
    // The banner lands on stderr; accept stdout as a fallback.
    let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
    let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
    parse_version_text(&stderr)
        .or_else(|| parse_version_text(&stdout))
        .ok_or(NcoError::VersionUnknown {
            output: stderr.trim().to_owned(),
        })
}

/// Extracts and parses a version number from banner text.
#[must_use]
pub fn parse_version_text(text: &str) -> Option<Version> {
    extract(text).as_deref().and_then(parse_lenient)
}

fn extract(text: &str) -> Option<String> {
    static QUOTED: OnceLock<Option<Regex>> = OnceLock::new();
    static UNQUOTED: OnceLock<Option<Regex>> = OnceLock::new();
    let quoted = QUOTED
        .get_or_init(|| Regex::new(r#"NCO netCDF Operators version "(\d[^"]*)""#).ok())
        .as_ref()?;
    let unquoted = UNQUOTED
        .get_or_init(|| Regex::new(r"NCO netCDF Operators version (\d\S*)").ok())
        .as_ref()?;
    let capture = quoted
        .captures(text)
        .or_else(|| unquoted.captures(text))?
        .get(1)?;
    capture
        .as_str()
        .split_whitespace()
        .next()
        .map(String::from)
}

/// Parses a dotted version, padding missing components.
fn parse_lenient(raw: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }
    // Keep the numeric prefix and pad to major.minor.patch.
    let prefix: String = raw
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = prefix.trim_end_matches('.').split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNER: &str = "NCO netCDF Operators version 4.5.4 (http://nco.sf.net) \
                          copyright 1995--2015 Charlie Zender";
    const QUOTED_BANNER: &str = "NCO netCDF Operators version \"4.3.6\" (http://nco.sf.net)";

    #[test]
    fn parses_unquoted_banner() {
        assert_eq!(parse_version_text(BANNER), Some(Version::new(4, 5, 4)));
    }

    #[test]
    fn parses_quoted_banner() {
        assert_eq!(parse_version_text(QUOTED_BANNER), Some(Version::new(4, 3, 6)));
    }

    #[test]
    fn pads_short_versions() {
        assert_eq!(
            parse_version_text("NCO netCDF Operators version 4.3 (x)"),
            Some(Version::new(4, 3, 0))
        );
    }

    #[test]
    fn keeps_numeric_components_of_prerelease_versions() {
        let version = parse_version_text("NCO netCDF Operators version 4.5.4-alpha08 (x)")
            .expect("parse prerelease");
        assert_eq!((version.major, version.minor, version.patch), (4, 5, 4));
    }

    #[test]
    fn rejects_unrelated_text() {
        assert_eq!(parse_version_text("no version here"), None);
    }

    #[test]
    fn version_ordering_matches_threshold_semantics() {
        let threshold = append_print_threshold();
        assert!(Version::new(4, 3, 6) < threshold);
        assert!(Version::new(4, 3, 7) >= threshold);
        assert!(Version::new(4, 5, 4) >= threshold);
    }
}
