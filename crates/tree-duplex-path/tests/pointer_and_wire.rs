use serde_json::json;
use tree_duplex_path::{
    format_json_pointer, from_json, parse_json_pointer, to_json, PathPattern, PathStep,
};

#[test]
fn numeric_steps_are_indices_in_pointers_but_not_on_the_wire() {
    // A pointer cannot tell "0" from 0, the wire form can.
    let from_pointer = parse_json_pointer("/list/0");
    assert_eq!(from_pointer[1], PathStep::Index(0));

    let from_wire = from_json(&json!(["list", "0"])).unwrap();
    assert_eq!(from_wire[1], PathStep::Key("0".into()));
    assert_eq!(format_json_pointer(&from_wire), "/list/0");
}

#[test]
fn pattern_selects_nested_arrays() {
    let pattern = PathPattern::parse("/rows/*/cells");
    let concrete = from_json(&json!(["rows", 3, "cells"])).unwrap();
    assert!(pattern.matches(&concrete));
    assert_eq!(to_json(&concrete), json!(["rows", 3, "cells"]));
}
