use std::fs;
use std::os::unix::fs::PermissionsExt;

use camino::Utf8PathBuf;
use ncokit_cdf::NcType;
use ncokit_cdf::writer::{numeric_attr, ClassicWriter};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

/// A fake toolkit directory populated with stub operator scripts.
struct Toolkit {
    _root: TempDir,
    dir: Utf8PathBuf,
}

impl Toolkit {
    fn engine(&self) -> Nco {
        Nco::with_config(Config::new().with_toolkit_dir(self.dir.clone()))
    }

    fn write_stub(&self, name: &str, body: &str) {
        let path = self.dir.join(name);
        let script = format!("#!/bin/sh\n{body}\n");
        fs::write(&path, script).expect("write stub");
        fs::set_permissions(path.as_std_path(), fs::Permissions::from_mode(0o755))
            .expect("mark stub executable");
    }

    /// Stub that logs each argument on its own line, then copies the input
    /// to `--output=` when one was given.
    fn copy_stub(&self, name: &str) {
        self.write_stub(
            name,
            r#"log="$0.log"
printf '%s\n' "$@" > "$log"
out=""
in=""
for arg in "$@"; do
  case "$arg" in
    --output=*) out="${arg#--output=}" ;;
    -*) ;;
    *) in="$arg" ;;
  esac
done
if [ -n "$out" ]; then
  if [ -n "$in" ]; then cp "$in" "$out" || exit 1; else : > "$out"; fi
fi
exit 0"#,
        );
    }

    fn argv_log(&self, name: &str) -> Vec<String> {
        let log = self.dir.join(format!("{name}.log"));
        fs::read_to_string(log.as_std_path())
            .expect("read argv log")
            .lines()
            .map(String::from)
            .collect()
    }

    fn plain_input(&self, name: &str) -> Utf8PathBuf {
        let path = self.dir.join(name);
        fs::write(path.as_std_path(), b"not actually netcdf").expect("write input");
        path
    }

    fn netcdf_input(&self, name: &str) -> Utf8PathBuf {
        let path = self.dir.join(name);
        let mut writer = ClassicWriter::new();
        let x = writer.add_dimension("x", 4);
        let var = writer.add_variable(
            "temperature",
            &[x],
            NcType::Double,
            vec![10.0, -999.0, 30.0, 40.0],
        );
        writer.variable_attribute(var, numeric_attr("_FillValue", NcType::Double, vec![-999.0]));
        writer.write_to(path.as_std_path()).expect("write netcdf input");
        path
    }
}

#[fixture]
fn toolkit() -> Toolkit {
    let root = TempDir::new().expect("toolkit dir");
    let dir = Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf8 toolkit dir");
    Toolkit { _root: root, dir }
}

#[rstest]
fn unknown_operator_is_rejected(toolkit: Toolkit) {
    let mut nco = toolkit.engine();
    let err = nco
        .call("ncfrobnicate", CallArgs::new())
        .expect_err("unregistered operator");
    assert!(matches!(err, NcoError::UnknownOperator { name } if name == "ncfrobnicate"));
}

#[rstest]
fn kwargs_and_inputs_reach_the_operator(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let mut nco = toolkit.engine();
    nco.ncra(
        CallArgs::new()
            .input(input.as_str())
            .kwarg("rec_apn", true)
            .kwarg("thr_nbr", 4i64),
    )
    .expect("stub call succeeds");
    let argv = toolkit.argv_log("ncra");
    assert!(argv.contains(&String::from("--rec_apn")));
    assert!(argv.contains(&String::from("--thr_nbr=4")));
    assert_eq!(argv.last(), Some(&input.to_string()));
}

#[rstest]
fn raw_options_precede_kwarg_tokens(toolkit: Toolkit) {
    toolkit.copy_stub("ncks");
    let input = toolkit.plain_input("in.nc");
    let mut nco = toolkit.engine();
    nco.ncks(
        CallArgs::new()
            .input(input.as_str())
            .option("--flt_byt")
            .kwarg("thr_nbr", 4i64),
    )
    .expect("stub call succeeds");
    let argv = toolkit.argv_log("ncks");
    let raw = argv
        .iter()
        .position(|t| t == "--flt_byt")
        .expect("raw option rendered");
    let kwarg = argv
        .iter()
        .position(|t| t == "--thr_nbr=4")
        .expect("kwarg rendered");
    assert!(raw < kwarg, "raw options must come before keyword options");
}

#[rstest]
fn synthesized_outputs_are_distinct_files(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let config = Config::new()
        .with_toolkit_dir(toolkit.dir.clone())
        .with_temp_dir(toolkit.dir.clone());
    let mut nco = Nco::with_config(config);
    let first = nco
        .ncra(CallArgs::new().input(input.as_str()))
        .expect("first call")
        .expect("not suppressed");
    let second = nco
        .ncra(CallArgs::new().input(input.as_str()))
        .expect("second call")
        .expect("not suppressed");
    let first = first.path().expect("path result").to_path_buf();
    let second = second.path().expect("path result").to_path_buf();
    assert_ne!(first, second);
    assert!(first.as_std_path().exists());
    assert!(second.as_std_path().exists());
}

#[rstest]
fn force_adds_overwrite_only_for_existing_outputs(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let output = toolkit.dir.join("out.nc");
    let mut nco = toolkit.engine();

    // Fresh output, nothing to overwrite.
    nco.ncra(CallArgs::new().input(input.as_str()).output(output.as_str()))
        .expect("fresh output");
    assert!(!toolkit.argv_log("ncra").iter().any(|a| a == "--overwrite"));

    // Now the file exists, so the default forces an overwrite.
    nco.ncra(CallArgs::new().input(input.as_str()).output(output.as_str()))
        .expect("existing output");
    assert!(toolkit.argv_log("ncra").iter().any(|a| a == "--overwrite"));

    // Explicitly unforced, the flag stays out even for an existing file.
    nco.ncra(
        CallArgs::new()
            .input(input.as_str())
            .output(output.as_str())
            .force(false),
    )
    .expect("unforced call");
    assert!(!toolkit.argv_log("ncra").iter().any(|a| a == "--overwrite"));
}

#[rstest]
fn explicit_overwrite_token_is_not_duplicated(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let output = toolkit.plain_input("out.nc");
    let mut nco = toolkit.engine();
    nco.ncra(
        CallArgs::new()
            .input(input.as_str())
            .output(output.as_str())
            .option("-O"),
    )
    .expect("call with -O");
    let argv = toolkit.argv_log("ncra");
    assert!(argv.iter().any(|a| a == "-O"));
    assert!(!argv.iter().any(|a| a == "--overwrite"));
}

#[rstest]
fn failure_surfaces_streams_and_return_code(toolkit: Toolkit) {
    toolkit.write_stub("ncwa", "echo oops out\necho oops err >&2\nexit 3");
    let mut nco = toolkit.engine();
    let err = nco
        .ncwa(CallArgs::new().input("in.nc"))
        .expect_err("stub exits 3");
    let NcoError::OperationFailed {
        stdout,
        stderr,
        return_code,
    } = err
    else {
        panic!("expected OperationFailed, got {err}");
    };
    assert_eq!(return_code, 3);
    assert_eq!(String::from_utf8_lossy(&stdout).trim(), "oops out");
    assert_eq!(String::from_utf8_lossy(&stderr).trim(), "oops err");
}

#[rstest]
fn failures_can_be_suppressed_to_an_absent_result(toolkit: Toolkit) {
    toolkit.write_stub("ncwa", "exit 3");
    let mut config = Config::new().with_toolkit_dir(toolkit.dir.clone());
    config.return_none_on_error = true;
    let mut nco = Nco::with_config(config);
    let result = nco
        .ncwa(CallArgs::new().input("in.nc"))
        .expect("failure suppressed");
    assert!(result.is_none());
    let last = nco.last_invocation().expect("invocation recorded");
    assert_eq!(last.return_code, 3);
}

#[rstest]
fn printing_calls_return_captured_stdout(toolkit: Toolkit) {
    toolkit.write_stub("ncks", "echo 'netcdf sample { }'");
    let mut nco = toolkit.engine();
    let out = nco
        .ncks(CallArgs::new().input("in.nc").option("-M"))
        .expect("print call")
        .expect("not suppressed");
    let CallOutput::Stdout(stdout) = out else {
        panic!("expected captured stdout");
    };
    assert!(String::from_utf8_lossy(&stdout).contains("netcdf sample"));
}

#[rstest]
fn ncdump_always_prints(toolkit: Toolkit) {
    toolkit.write_stub("ncdump", "echo header");
    let mut nco = toolkit.engine();
    let out = nco
        .ncdump(CallArgs::new().input("in.nc"))
        .expect("ncdump call")
        .expect("not suppressed");
    assert!(matches!(out, CallOutput::Stdout(_)));
    // No output token is synthesized for a printing call.
    assert!(!nco
        .last_invocation()
        .expect("recorded")
        .tokens
        .iter()
        .any(|t| t.starts_with("--output=")));
}

#[rstest]
fn array_request_round_trips_through_the_output(toolkit: Toolkit) {
    toolkit.copy_stub("ncks");
    let input = toolkit.netcdf_input("in.nc");
    let config = Config::new()
        .with_toolkit_dir(toolkit.dir.clone())
        .with_temp_dir(toolkit.dir.clone());
    let mut nco = Nco::with_config(config);
    let out = nco
        .ncks(CallArgs::new().input(input.as_str()).return_array("temperature"))
        .expect("call with array request")
        .expect("not suppressed");
    let CallOutput::Array(array) = out else {
        panic!("expected an array");
    };
    assert_eq!(array.values(), &[10.0, -999.0, 30.0, 40.0]);
}

#[rstest]
fn masked_array_request_masks_fill_values(toolkit: Toolkit) {
    toolkit.copy_stub("ncks");
    let input = toolkit.netcdf_input("in.nc");
    let config = Config::new()
        .with_toolkit_dir(toolkit.dir.clone())
        .with_temp_dir(toolkit.dir.clone());
    let mut nco = Nco::with_config(config);
    let out = nco
        .ncks(
            CallArgs::new()
                .input(input.as_str())
                .return_masked_array("temperature"),
        )
        .expect("call with masked request")
        .expect("not suppressed");
    let CallOutput::MaskedArray(masked) = out else {
        panic!("expected a masked array");
    };
    assert_eq!(masked.mask(), &[false, true, false, false]);
}

#[rstest]
fn default_return_shape_applies_until_unset(toolkit: Toolkit) {
    toolkit.copy_stub("ncks");
    let input = toolkit.netcdf_input("in.nc");
    let config = Config::new()
        .with_toolkit_dir(toolkit.dir.clone())
        .with_temp_dir(toolkit.dir.clone());
    let mut nco = Nco::with_config(config);
    nco.set_return_array("temperature");
    let out = nco
        .ncks(CallArgs::new().input(input.as_str()))
        .expect("call")
        .expect("not suppressed");
    assert!(matches!(out, CallOutput::Array(_)));

    nco.unset_return_array();
    let out = nco
        .ncks(CallArgs::new().input(input.as_str()))
        .expect("call")
        .expect("not suppressed");
    assert!(matches!(out, CallOutput::Path(_)));
}

#[rstest]
fn print_override_skips_output_synthesis(toolkit: Toolkit) {
    toolkit.write_stub("ncap2", "echo computed");
    let mut nco = toolkit.engine();
    let out = nco
        .ncap2(CallArgs::new().input("in.nc").operator_prints_out())
        .expect("print-override call")
        .expect("not suppressed");
    assert!(matches!(out, CallOutput::Stdout(_)));
    assert!(!nco
        .last_invocation()
        .expect("recorded")
        .tokens
        .iter()
        .any(|t| t.starts_with("--output=")));
}

#[rstest]
fn operator_description_is_fetched_and_cached(toolkit: Toolkit) {
    toolkit.write_stub("ncwa", "echo 'ncwa: weighted averages of variables'");
    let mut nco = toolkit.engine();
    let text = nco
        .operator_description("ncwa")
        .expect("description")
        .to_owned();
    assert!(text.contains("weighted averages"));
    // Cached: removing the stub must not affect a second request.
    fs::remove_file(toolkit.dir.join("ncwa").as_std_path()).expect("remove stub");
    assert_eq!(nco.operator_description("ncwa").expect("cached"), text);
    assert!(matches!(
        nco.operator_description("ncfrobnicate"),
        Err(NcoError::UnknownOperator { .. })
    ));
}

#[rstest]
fn in_place_operator_returns_its_input(toolkit: Toolkit) {
    toolkit.copy_stub("ncatted");
    let input = toolkit.plain_input("in.nc");
    let mut nco = toolkit.engine();
    let out = nco
        .ncatted(CallArgs::new().input(input.as_str()))
        .expect("in-place call")
        .expect("not suppressed");
    assert_eq!(out.path(), Some(input.as_path()));
    assert!(!toolkit
        .argv_log("ncatted")
        .iter()
        .any(|a| a.starts_with("--output=")));
}

#[rstest]
fn in_place_operator_rejects_an_explicit_output(toolkit: Toolkit) {
    let mut nco = toolkit.engine();
    let err = nco
        .ncrename(CallArgs::new().input("in.nc").output("out.nc"))
        .expect_err("in-place operators take no output");
    assert!(matches!(err, NcoError::InvalidOutputSpec { .. }));
}

#[rstest]
fn environment_variables_reach_the_child(toolkit: Toolkit) {
    toolkit.write_stub("ncra", "printf '%s' \"greeting=$NCOKIT_TEST_GREETING\"");
    let mut nco = toolkit.engine();
    nco.ncra(
        CallArgs::new()
            .input("in.nc")
            .env("NCOKIT_TEST_GREETING", "hello"),
    )
    .expect("call with env");
    let last = nco.last_invocation().expect("recorded");
    assert_eq!(String::from_utf8_lossy(&last.stdout), "greeting=hello");
}

#[rstest]
fn shell_mode_preserves_tokens_with_spaces(toolkit: Toolkit) {
    toolkit.copy_stub("ncatted");
    let input = toolkit.plain_input("in.nc");
    let mut nco = toolkit.engine();
    nco.ncatted(
        CallArgs::new()
            .input(input.as_str())
            .kwarg("units", "degrees north")
            .use_shell(),
    )
    .expect("shell-mode call");
    let argv = toolkit.argv_log("ncatted");
    assert!(argv.contains(&String::from("--units=degrees north")));
}

#[rstest]
fn global_options_apply_and_per_call_values_win(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let config = Config::new()
        .with_toolkit_dir(toolkit.dir.clone())
        .with_global_option("thr_nbr", 2i64)
        .with_global_option("no_tmp_fl", true);
    let mut nco = Nco::with_config(config);

    nco.ncra(CallArgs::new().input(input.as_str()))
        .expect("call with globals");
    let argv = toolkit.argv_log("ncra");
    assert!(argv.contains(&String::from("--thr_nbr=2")));
    assert!(argv.contains(&String::from("--no_tmp_fl")));

    nco.ncra(CallArgs::new().input(input.as_str()).kwarg("thr_nbr", 8i64))
        .expect("call with override");
    let argv = toolkit.argv_log("ncra");
    assert!(argv.contains(&String::from("--thr_nbr=8")));
    assert!(!argv.contains(&String::from("--thr_nbr=2")));
}

#[rstest]
fn debug_level_renders_the_debug_flag(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let mut nco = toolkit.engine();
    nco.ncra(CallArgs::new().input(input.as_str()).debug(3))
        .expect("call with debug");
    assert!(toolkit
        .argv_log("ncra")
        .contains(&String::from("--nco_dbg_lvl=3")));
}

#[rstest]
fn last_invocation_records_the_exact_vector(toolkit: Toolkit) {
    toolkit.copy_stub("ncra");
    let input = toolkit.plain_input("in.nc");
    let mut nco = toolkit.engine();
    nco.ncra(CallArgs::new().input(input.as_str()).kwarg("mro", true))
        .expect("call");
    let last = nco.last_invocation().expect("recorded");
    assert_eq!(last.operator, "ncra");
    assert_eq!(last.return_code, 0);
    assert_eq!(last.tokens[0], toolkit.dir.join("ncra").as_str());
    assert!(last.tokens.contains(&String::from("--mro")));
}

#[test]
fn registry_lists_every_operator_once() {
    let names: Vec<_> = operators().iter().map(|spec| spec.name).collect();
    assert_eq!(names.len(), 14);
    let mut deduped = names.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), names.len());
    for name in ["ncap2", "ncdump", "ncks", "ncwa"] {
        assert!(names.contains(&name), "{name} missing from registry");
    }
    let in_place: Vec<_> = operators()
        .iter()
        .filter(|spec| spec.in_place)
        .map(|spec| spec.name)
        .collect();
    assert_eq!(in_place, ["ncatted", "ncrename"]);
}
