//! Output-behavior classification and output-target resolution.
//!
//! Whether an operator prints to standard output, overwrites, or appends is
//! decided from the literal assembled token list, not the operator name
//! alone: the same operator behaves either way depending on flags.
//! [`classify`] is a pure function over an immutable version-keyed pattern
//! table — which flags imply "prints" changed across NCO releases when an
//! append flag is present (older versions overload the metadata print
//! flags during `ncks` append operations).

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use tempfile::Builder;

use crate::error::NcoError;
use crate::version::append_print_threshold;

/// Tokens implying an existing output should be overwritten.
pub const OVERWRITE_TOKENS: [&str; 3] = ["-O", "--ovr", "--overwrite"];

/// Tokens implying append-to-existing-output.
pub const APPEND_TOKENS: [&str; 3] = ["-A", "--apn", "--append"];

/// Tokens implying the operator prints rather than writes a file.
const PRINT_TOKENS_BROAD: [&str; 19] = [
    "ncdump",
    "-H",
    "--data",
    "--hieronymus",
    "-M",
    "--Mtd",
    "--Metadata",
    "-m",
    "--mtd",
    "--metadata",
    "-P",
    "--prn",
    "--print",
    "-r",
    "--revision",
    "--vrs",
    "--version",
    "--u",
    "--units",
];

/// Reduced print set used for `ncks` append operations on NCO versions at
/// or above the threshold, where the metadata flags no longer print.
const PRINT_TOKENS_APPEND_MODERN: [&str; 5] =
    ["ncdump", "-r", "--revision", "--vrs", "--version"];

/// What the assembled token list says about the invocation's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    /// The operator produces meaningful standard output instead of a file.
    pub prints: bool,
    /// A token already requests overwriting the output.
    pub overwrites: bool,
    /// A token already requests appending to the output.
    pub appends: bool,
}

impl Classification {
    /// Whether any token already settles the overwrite question, making a
    /// forced `--overwrite` inapplicable.
    #[must_use]
    pub const fn settles_overwrite(&self) -> bool {
        self.prints || self.overwrites || self.appends
    }
}

/// Classifies assembled `tokens` for `operator` under `tool_version`.
///
/// An unknown version (probe failed) conservatively applies the broad
/// print set, matching pre-threshold behavior.
#[must_use]
pub fn classify(
    operator: &str,
    tokens: &[String],
    tool_version: Option<&Version>,
) -> Classification {
    let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));
    let overwrites = has(&OVERWRITE_TOKENS);
    let appends = has(&APPEND_TOKENS);

    let reduced = appends
        && operator == "ncks"
        && tool_version.is_some_and(|v| *v >= append_print_threshold());
    let print_set: &[&str] = if reduced {
        &PRINT_TOKENS_APPEND_MODERN
    } else {
        &PRINT_TOKENS_BROAD
    };
    let prints = operator == "ncdump" || has(print_set);

    Classification {
        prints,
        overwrites,
        appends,
    }
}

/// Validates an output-target list: absent, or exactly one path.
///
/// # Errors
///
/// Returns [`NcoError::InvalidOutputSpec`] for more than one element.
pub(crate) fn normalize_output(outputs: &[String]) -> Result<Option<&str>, NcoError> {
    match outputs {
        [] => Ok(None),
        [single] => Ok(Some(single)),
        many => Err(NcoError::InvalidOutputSpec {
            detail: format!("only one output allowed, got {}", many.len()),
        }),
    }
}

/// Synthesizes a unique temporary output path named after the operator and
/// the first input's basename.
///
/// The path is reserved and immediately released, so the name is fresh but
/// the file does not exist when the operator runs (an existing file would
/// trigger NCO's overwrite prompt). The engine never deletes these files;
/// see `TempOutputDir` for scoped cleanup.
pub(crate) fn temp_output_path(
    temp_dir: Option<&Utf8Path>,
    operator: &str,
    first_input: Option<&str>,
) -> Result<Utf8PathBuf, NcoError> {
    let dir = match temp_dir {
        Some(dir) => dir.to_path_buf(),
        None => Utf8PathBuf::from_path_buf(std::env::temp_dir()).map_err(|path| {
            NcoError::io(
                &path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "temporary directory is not valid UTF-8",
                ),
            )
        })?,
    };
    let base = first_input
        .map(Utf8Path::new)
        .and_then(Utf8Path::file_name)
        .unwrap_or("out");
    let prefix = format!("{operator}.{base}.");

    let file = Builder::new()
        .prefix(&prefix)
        .suffix(".tmp.nc")
        .tempfile_in(&dir)
        .map_err(|source| NcoError::io(dir.as_std_path(), source))?;
    let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).map_err(|path| {
        NcoError::io(
            &path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 temp path"),
        )
    })?;
    file.close()
        .map_err(|source| NcoError::io(path.as_std_path(), source))?;
    Ok(path)
}
