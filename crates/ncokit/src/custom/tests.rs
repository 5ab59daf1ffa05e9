//! Render tests for the structured option builders, checked token-for-token
//! against the switch forms NCO documents.

use super::*;

fn spec(tokens: &[String]) -> &str {
    assert_eq!(tokens.len(), 2, "expected switch plus spec, got {tokens:?}");
    assert_eq!(tokens[0], "-a");
    &tokens[1]
}

// ---------------------------------------------------------------------------
// Atted
// ---------------------------------------------------------------------------

#[test]
fn atted_string_value_defaults_to_char() {
    let atted = Atted::new(AttedMode::Overwrite, "units", "temperature", "Kelvin");
    assert_eq!(spec(&atted.tokens()), "units,temperature,o,c,Kelvin");
}

#[test]
fn atted_integer_defaults_to_int() {
    let atted = Atted::new(AttedMode::Create, "levels", "pressure", 17);
    assert_eq!(spec(&atted.tokens()), "levels,pressure,c,i,17");
}

#[test]
fn atted_float_defaults_to_double() {
    let atted = Atted::new(AttedMode::Append, "mean", "time_bands", 3.14159826253);
    assert_eq!(spec(&atted.tokens()), "mean,time_bands,a,d,3.14159826253");
}

#[test]
fn atted_explicit_kinds_override_defaults() {
    let byte = Atted::new(AttedMode::Overwrite, "min", "temperature", -127).with_kind(AttKind::Byte);
    assert_eq!(spec(&byte.tokens()), "min,temperature,o,b,-127");

    let short = Atted::new(AttedMode::Overwrite, "max", "temperature", 127).with_kind(AttKind::Short);
    assert_eq!(spec(&short.tokens()), "max,temperature,o,s,127");

    let float =
        Atted::new(AttedMode::Append, "mean_float", "time_bands", 3.5).with_kind(AttKind::Float);
    assert_eq!(spec(&float.tokens()), "mean_float,time_bands,a,f,3.5");
}

#[test]
fn atted_integer_list_with_int_kind() {
    let atted = Atted::new(AttedMode::Modify, "min-max", "pressure", vec![100i64, 10000])
        .with_kind(AttKind::Int);
    assert_eq!(spec(&atted.tokens()), "min-max,pressure,m,i,100,10000");
}

#[test]
fn atted_integer_list_with_double_kind_gains_decimal_points() {
    let atted = Atted::new(
        AttedMode::Create,
        "array",
        "time_bands",
        vec![1i64, 3, 5, 7, 9],
    )
    .with_kind(AttKind::Double);
    assert_eq!(spec(&atted.tokens()), "array,time_bands,c,d,1.0,3.0,5.0,7.0,9.0");
}

#[test]
fn atted_float_with_char_kind_renders_natural_form() {
    let atted =
        Atted::new(AttedMode::Append, "mean_sng", "time_bands", 3.14159826253).with_kind(AttKind::Char);
    assert_eq!(spec(&atted.tokens()), "mean_sng,time_bands,a,c,3.14159826253");
}

#[test]
fn atted_single_string_with_string_kind_uses_sng() {
    let atted = Atted::new(AttedMode::Nappend, "units", "height", "height in mm")
        .with_kind(AttKind::String);
    assert_eq!(spec(&atted.tokens()), "units,height,n,sng,height in mm");
}

#[test]
fn atted_string_list_defaults_to_sng() {
    let atted = Atted::new(
        AttedMode::Append,
        "long_name",
        "temperature",
        vec!["mean", "sea", "level", "temperature"],
    );
    assert_eq!(
        spec(&atted.tokens()),
        "long_name,temperature,a,sng,mean,sea,level,temperature"
    );
}

#[test]
fn atted_unsigned_64_bit_kind() {
    let atted = Atted::new(AttedMode::Nappend, "long", "random", 2i64.pow(33))
        .with_kind(AttKind::Uint64);
    assert_eq!(spec(&atted.tokens()), "long,random,n,ull,8589934592");
}

#[test]
fn atted_delete_carries_no_type_or_value() {
    let atted = Atted::delete("short_name", "temp");
    assert_eq!(spec(&atted.tokens()), "short_name,temp,d,,");
}

#[test]
fn atted_delete_all_attributes_pattern() {
    let atted = Atted::delete(".*", "");
    assert_eq!(spec(&atted.tokens()), ".*,,d,,");
}

#[test]
fn atted_value_with_spaces_stays_one_token() {
    let atted = Atted::new(AttedMode::Create, "attr", "random", "some value with spaces");
    let tokens = atted.tokens();
    assert_eq!(tokens, vec!["-a", "attr,random,c,c,some value with spaces"]);
}

// ---------------------------------------------------------------------------
// Limit
// ---------------------------------------------------------------------------

fn limit_spec(tokens: &[String]) -> &str {
    assert_eq!(tokens.len(), 2, "expected switch plus spec, got {tokens:?}");
    assert_eq!(tokens[0], "-d");
    &tokens[1]
}

#[test]
fn limit_coordinate_range_keeps_decimal_points() {
    let limit = Limit::range("lat", 0.0, 88.1);
    assert_eq!(limit_spec(&limit.tokens()), "lat,0.0,88.1");
}

#[test]
fn limit_index_range_with_stride() {
    let limit = Limit::range("time", 0, 10).stride(3);
    assert_eq!(limit_spec(&limit.tokens()), "time,0,10,3");
}

#[test]
fn limit_large_coordinate_with_stride() {
    let limit = Limit::range("time", 1.0, 2e9).stride(3);
    assert_eq!(limit_spec(&limit.tokens()), "time,1.0,2000000000.0,3");
}

#[test]
fn limit_full_form_with_subcycle() {
    let limit = Limit::range("three", 10, 30).stride(4).subcycle(2);
    assert_eq!(limit_spec(&limit.tokens()), "three,10,30,4,2");
}

#[test]
fn limit_stride_only() {
    let limit = Limit::new("three").stride(4);
    assert_eq!(limit_spec(&limit.tokens()), "three,,,4");
}

#[test]
fn limit_subcycle_only_keeps_stride_slot_empty() {
    let limit = Limit::new("three").subcycle(3);
    assert_eq!(limit_spec(&limit.tokens()), "three,,,,3");
}

#[test]
fn limit_single_point_has_no_trailing_comma() {
    let limit = Limit::single("three", 20.0);
    assert_eq!(limit_spec(&limit.tokens()), "three,20.0");
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

#[test]
fn rename_emits_one_switch_pair_per_entry_in_order() {
    let rename = Rename::new(RenameKind::Group)
        .map("lon", "longitude")
        .map("lat", "latitude")
        .map("lev", "level");
    assert_eq!(
        rename.tokens(),
        vec!["-g", "lon,longitude", "-g", "lat,latitude", "-g", "lev,level"]
    );
}

#[test]
fn rename_kind_codes() {
    assert_eq!(RenameKind::Attribute.code(), 'a');
    assert_eq!(RenameKind::Dimension.code(), 'd');
    assert_eq!(RenameKind::Group.code(), 'g');
    assert_eq!(RenameKind::Variable.code(), 'v');
}

#[test]
fn custom_option_delegates_rendering() {
    let opt = CustomOption::from(Limit::single("lon", 10));
    assert_eq!(opt.tokens(), vec!["-d", "lon,10"]);
}
